use crate::context::Context;
use crate::output::print_json;
use clap::Subcommand;
use pulse_core::workspace::{Plan, SubscriptionStatus, Workspace};

#[derive(Subcommand)]
pub enum WorkspaceSubcommand {
    /// Create a workspace and print its id and invite code
    Create {
        /// Company or team name
        name: String,
    },

    /// Show a workspace with its billing state and member count
    Show {
        /// Workspace id
        id: String,
    },

    /// Record the billing provider's customer, subscription and plan
    Billing {
        /// Workspace id
        id: String,
        /// Billing customer id, used to open the billing portal
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        subscription: Option<String>,
        /// free | pro
        #[arg(long)]
        plan: Option<String>,
        /// trialing | active | past_due | canceled | unpaid | incomplete
        #[arg(long)]
        status: Option<String>,
    },
}

pub fn run(ctx: &Context, subcmd: WorkspaceSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        WorkspaceSubcommand::Create { name } => create(ctx, &name, json),
        WorkspaceSubcommand::Show { id } => show(ctx, &id, json),
        WorkspaceSubcommand::Billing {
            id,
            customer,
            subscription,
            plan,
            status,
        } => billing(
            ctx,
            &id,
            BillingUpdate {
                customer,
                subscription,
                plan,
                status,
            },
            json,
        ),
    }
}

fn create(ctx: &Context, name: &str, json: bool) -> anyhow::Result<()> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("workspace name must not be empty");
    }
    let db = ctx.open_db()?;
    let workspace = Workspace::new(name);
    db.create_workspace(&workspace)?;

    if json {
        print_json(&workspace)?;
    } else {
        println!("Created workspace '{}'", workspace.name);
        println!("  id:          {}", workspace.id);
        println!("  invite code: {}", workspace.invite_code);
    }
    Ok(())
}

fn show(ctx: &Context, id: &str, json: bool) -> anyhow::Result<()> {
    let db = ctx.open_db()?;
    let workspace = db.workspace(id)?;
    let members = db.count_members(id)?;

    if json {
        let mut value = serde_json::to_value(&workspace)?;
        value["member_count"] = serde_json::json!(members);
        print_json(&value)?;
    } else {
        println!("{} ({})", workspace.name, workspace.id);
        println!("  invite code:  {}", workspace.invite_code);
        println!(
            "  plan:         {} ({})",
            workspace.billing.plan.as_str(),
            workspace.billing.subscription_status.as_str()
        );
        println!("  members:      {members}");
    }
    Ok(())
}

struct BillingUpdate {
    customer: Option<String>,
    subscription: Option<String>,
    plan: Option<String>,
    status: Option<String>,
}

/// Fields left out keep their stored values.
fn billing(ctx: &Context, id: &str, update: BillingUpdate, json: bool) -> anyhow::Result<()> {
    let db = ctx.open_db()?;
    let mut link = db.workspace(id)?.billing;
    if let Some(customer) = update.customer {
        link.customer_id = Some(customer.trim().to_string()).filter(|c| !c.is_empty());
    }
    if let Some(subscription) = update.subscription {
        link.subscription_id = Some(subscription.trim().to_string()).filter(|s| !s.is_empty());
    }
    if let Some(plan) = update.plan {
        link.plan = plan.parse::<Plan>()?;
    }
    if let Some(status) = update.status {
        link.subscription_status = status.parse::<SubscriptionStatus>()?;
    }
    db.set_billing(id, &link)?;

    if json {
        print_json(&link)?;
    } else {
        println!(
            "Billing for {id}: {} ({}), customer {}",
            link.plan,
            link.subscription_status,
            link.customer_id.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
