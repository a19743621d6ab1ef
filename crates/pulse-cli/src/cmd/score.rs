use crate::context::Context;
use crate::output::{print_json, score_cell, Table};
use pulse_core::dashboard::AlignmentSummary;

/// Print the current alignment reading and its weekly series.
pub fn run(ctx: &Context, workspace_id: &str, json: bool) -> anyhow::Result<()> {
    let db = ctx.open_db()?;
    db.workspace(workspace_id)?;
    let summary = AlignmentSummary::load(&db, workspace_id, &ctx.config)?;

    if json {
        return print_json(&summary);
    }

    let a = &summary.alignment;
    println!(
        "Alignment: {}/100 ({}), previous {}, {} {:+}",
        a.current, a.band, a.previous, a.trend, a.delta
    );
    if a.emergency {
        println!("EMERGENCY: alignment is below {}", ctx.config.alerts.emergency_below);
    } else if a.warning {
        println!(
            "Warning: alignment dropped by at least {} points",
            ctx.config.alerts.warning_drop
        );
    }

    if summary.series.is_empty() {
        println!("No pulses yet.");
        return Ok(());
    }
    println!();
    let mut table = Table::new(&[
        "WEEK", "RESPONSES", "SCORE", "VISION", "WORKLOAD", "COMMS", "STRATEGY", "WELLBEING",
    ]);
    for w in &summary.series {
        table.row([
            w.week.to_string(),
            w.responses.to_string(),
            score_cell(w.score),
            score_cell(w.vision),
            score_cell(w.workload),
            score_cell(w.communication),
            score_cell(w.strategy),
            score_cell(w.wellbeing),
        ]);
    }
    table.print();
    Ok(())
}
