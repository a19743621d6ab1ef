use crate::output::print_json;
use pulse_core::week::WeekStart;

/// Print the week key for `date` (default: today, local time).
pub fn run(date: Option<&str>, json: bool) -> anyhow::Result<()> {
    let week = match date {
        Some(d) => WeekStart::bucket_str(d)?,
        None => WeekStart::of(chrono::Local::now().date_naive()),
    };

    if json {
        print_json(&serde_json::json!({
            "week_start": week,
            "week_end": week.end(),
            "label": week.label(),
        }))?;
    } else {
        println!("{week}");
    }
    Ok(())
}
