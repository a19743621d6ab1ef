use crate::context::Context;
use crate::output::{print_json, Table};
use clap::Subcommand;
use pulse_core::db::PulseDb;
use pulse_core::workspace::{Member, DEFAULT_ROLE};

#[derive(Subcommand)]
pub enum MemberSubcommand {
    /// Add a member to a workspace, by id or by its invite code
    Add {
        #[arg(long, required_unless_present = "invite", conflicts_with = "invite")]
        workspace: Option<String>,
        /// Invite code shared from an existing workspace
        #[arg(long)]
        invite: Option<String>,
        #[arg(long)]
        email: String,
        /// Full name shown on the dashboard
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = DEFAULT_ROLE)]
        role: String,
    },

    /// List the members of a workspace
    List {
        #[arg(long)]
        workspace: String,
    },

    /// Remove a member from a workspace
    Remove {
        #[arg(long)]
        workspace: String,
        /// Member id
        id: String,
    },
}

pub fn run(ctx: &Context, subcmd: MemberSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        MemberSubcommand::Add {
            workspace,
            invite,
            email,
            name,
            role,
        } => {
            let target = match (workspace, invite) {
                (_, Some(code)) => Target::Invite(code),
                (Some(id), None) => Target::Id(id),
                (None, None) => anyhow::bail!("either --workspace or --invite is required"),
            };
            add(ctx, target, &email, name, &role, json)
        }
        MemberSubcommand::List { workspace } => list(ctx, &workspace, json),
        MemberSubcommand::Remove { workspace, id } => remove(ctx, &workspace, &id, json),
    }
}

enum Target {
    Id(String),
    Invite(String),
}

impl Target {
    fn workspace_id(self, db: &PulseDb) -> anyhow::Result<String> {
        match self {
            Target::Id(id) => Ok(id),
            Target::Invite(code) => {
                let code = code.trim();
                db.workspace_by_invite(code)?
                    .map(|ws| ws.id)
                    .ok_or_else(|| anyhow::anyhow!("no workspace uses invite code '{code}'"))
            }
        }
    }
}

fn add(
    ctx: &Context,
    target: Target,
    email: &str,
    name: Option<String>,
    role: &str,
    json: bool,
) -> anyhow::Result<()> {
    let email = email.trim();
    if email.is_empty() {
        anyhow::bail!("email must not be empty");
    }
    let db = ctx.open_db()?;
    let workspace_id = target.workspace_id(&db)?;
    let mut member = Member::new(workspace_id, email).with_role(role);
    if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
        member = member.with_name(name.trim());
    }
    db.add_member(&member)?;

    if json {
        print_json(&member)?;
    } else {
        println!(
            "Added {} ({}) as {} to workspace {}",
            member.display_name(),
            member.id,
            member.role,
            member.workspace_id
        );
    }
    Ok(())
}

fn list(ctx: &Context, workspace_id: &str, json: bool) -> anyhow::Result<()> {
    let db = ctx.open_db()?;
    db.workspace(workspace_id)?;
    let members = db.members(workspace_id)?;

    if json {
        return print_json(&members);
    }
    if members.is_empty() {
        println!("No members.");
        return Ok(());
    }
    let mut table = Table::new(&["ID", "NAME", "EMAIL", "ROLE"]);
    for m in &members {
        table.row([
            m.id.as_str(),
            m.display_name(),
            m.email.as_str(),
            m.role.as_str(),
        ]);
    }
    table.print();
    Ok(())
}

fn remove(ctx: &Context, workspace_id: &str, member_id: &str, json: bool) -> anyhow::Result<()> {
    let db = ctx.open_db()?;
    db.remove_member(workspace_id, member_id)?;

    if json {
        print_json(&serde_json::json!({ "removed": member_id }))
    } else {
        println!("Removed member {member_id}");
        Ok(())
    }
}
