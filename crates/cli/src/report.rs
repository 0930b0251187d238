//! Plain-text reports of the export plan and of the tracked results.

use snowcover_cloud::{ExportTask, MonthlyExportResult};

const RULE: &str = "---------------------------------------------\n";

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn export_plan_report(plan: &MonthlyExportResult) -> String {
    let mut out = String::from("\n");
    out.push_str(RULE);
    out.push_str(&format!("{} Images Export Plan:\n", capitalize(plan.frequency)));
    out.push_str(RULE);

    out.push_str("Images to export\n");
    if plan.images_to_export.is_empty() {
        out.push_str("\t└ No images to export\n");
    }
    for month in &plan.images_to_export {
        out.push_str(&format!("\t└ {}\n", month));
    }

    out.push_str("Images excluded\n");
    if plan.images_excluded.is_empty() {
        out.push_str("\t└ No images excluded\n");
    }
    for excluded in &plan.images_excluded {
        out.push_str(&format!("\t└ {}\n", excluded));
    }
    out
}

pub fn export_results_report(tasks: &[ExportTask]) -> String {
    let mut out = String::from("\n");
    out.push_str(RULE);
    out.push_str("Export Results:\n");
    out.push_str(RULE);

    if tasks.is_empty() {
        out.push_str("- No images exported\n");
        return out;
    }
    out.push_str(&format!("- Exporting {} images.\n", tasks.len()));
    for task in tasks {
        match &task.error {
            Some(error) => out.push_str(&format!(
                "\t└ {} : {} - {}\n",
                task.image, task.status, error
            )),
            None => out.push_str(&format!("\t└ {} : {}\n", task.image, task.status)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowcover_cloud::{ExcludedMonth, ExclusionReason, TaskState, TaskStatus};
    use snowcover_core::calendar::YearMonth;

    fn ym(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m).unwrap()
    }

    #[test]
    fn test_empty_plan() {
        let report = export_plan_report(&MonthlyExportResult::default());
        assert!(report.contains("Monthly Images Export Plan:"));
        assert!(report.contains("\t└ No images to export\n"));
        assert!(report.contains("\t└ No images excluded\n"));
    }

    #[test]
    fn test_plan_lists_months() {
        let plan = MonthlyExportResult {
            images_to_export: vec![ym(2023, 1)],
            images_excluded: vec![ExcludedMonth {
                month: ym(2023, 2),
                reason: ExclusionReason::MonthIncomplete,
            }],
            ..MonthlyExportResult::default()
        };
        let report = export_plan_report(&plan);
        assert!(report.contains("Images to export\n\t└ 2023-01\n"));
        assert!(report.contains("Images excluded\n\t└ 2023-02: Month incomplete\n"));
    }

    #[test]
    fn test_results_report() {
        assert!(export_results_report(&[]).contains("- No images exported\n"));

        let mut done = ExportTask::mock("snow_2023_01", "proj/monthly/snow_2023_01");
        done.status = TaskStatus::Remote(TaskState::Completed);
        let failed = ExportTask::failed_to_create("snow_2023_02", "proj/monthly/snow_2023_02", "boom");

        let report = export_results_report(&[done, failed]);
        assert!(report.contains("- Exporting 2 images.\n"));
        assert!(report.contains("\t└ snow_2023_01 : completed\n"));
        assert!(report.contains("\t└ snow_2023_02 : failed_to_create - boom\n"));
    }
}
