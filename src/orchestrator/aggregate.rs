//! Folding strategy reports into the running outcome

use crate::dispatch::DispatchReport;
use crate::model::RunOutcome;

/// Merge one iteration's report into `running`.
///
/// Counters add. Rows replace the running set only when the report says the
/// child produced or observed rows. Files are a union keyed by path, the
/// newest entry winning.
pub fn merge(running: &mut RunOutcome, report: DispatchReport) {
    let DispatchReport {
        outcome,
        rows_observed,
        ..
    } = report;

    running.add_errors(outcome.error_count);
    running.stopped |= outcome.stopped;
    if rows_observed {
        running.rows = outcome.rows;
    }
    running.files.extend(outcome.files);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResultFile, ResultFileKind, Row};

    fn running() -> RunOutcome {
        let mut outcome = RunOutcome::failed(1).with_rows(vec![Row::new().with_field("id", 1)]);
        outcome.add_file(ResultFile::new(ResultFileKind::General, "/out/a.csv"));
        outcome
    }

    #[test]
    fn test_empty_iteration_keeps_rows() {
        let mut outcome = running();
        merge(&mut outcome, DispatchReport::new(RunOutcome::new(), false));

        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.error_count, 1);
    }

    #[test]
    fn test_observed_rows_replace_and_counters_add() {
        let mut outcome = running();
        let produced = RunOutcome::failed(2).with_rows(vec![
            Row::new().with_field("id", 2),
            Row::new().with_field("id", 3),
        ]);
        merge(&mut outcome, DispatchReport::new(produced, true));

        assert_eq!(outcome.error_count, 3);
        assert_eq!(outcome.rows.len(), 2);
    }

    #[test]
    fn test_files_are_unioned_newest_wins() {
        let mut outcome = running();
        let mut produced = RunOutcome::new();
        produced.add_file(ResultFile::new(ResultFileKind::Log, "/out/a.csv"));
        produced.add_file(ResultFile::new(ResultFileKind::General, "/out/b.csv"));
        merge(&mut outcome, DispatchReport::new(produced, false));

        assert_eq!(outcome.files.len(), 2);
        assert_eq!(outcome.files["/out/a.csv"].kind, ResultFileKind::Log);
    }
}
