//! LCOV Report Formatter
//!
//! ```text
//! TN:
//! SF:<source file>
//! FN:<line>,<function name>
//! FNDA:<execution count>,<function name>
//! FNF:<functions found>
//! FNH:<functions hit>
//! BRDA:<line>,<block>,<branch>,<taken>
//! BRF:<branches found>
//! BRH:<branches hit>
//! DA:<line>,<execution count>
//! LF:<lines found>
//! LH:<lines hit>
//! end_of_record
//! ```

use crate::coverage::{CoveragePayload, FileCoverageRecord};
use std::fmt::Write;

/// LCOV format report generator
#[derive(Debug)]
pub struct LcovFormatter<'a> {
    payload: &'a CoveragePayload,
}

impl<'a> LcovFormatter<'a> {
    /// Create a new LCOV formatter from coverage data
    #[must_use]
    pub fn new(payload: &'a CoveragePayload) -> Self {
        Self { payload }
    }

    /// Generate LCOV format report as a string
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        for record in self.payload.records() {
            output.push_str("TN:\n");
            let _ = writeln!(output, "SF:{}", record.path());
            Self::write_functions(&mut output, record);
            Self::write_branches(&mut output, record);
            Self::write_lines(&mut output, record);
            output.push_str("end_of_record\n");
        }

        output
    }

    fn write_functions(output: &mut String, record: &FileCoverageRecord) {
        let functions = &record.detail().functions;
        for func in functions {
            let _ = writeln!(output, "FN:{},{}", func.line, func.name);
        }
        for func in functions {
            let _ = writeln!(output, "FNDA:{},{}", func.hits, func.name);
        }
        let counts = record.counts().functions;
        let _ = writeln!(output, "FNF:{}", counts.total);
        let _ = writeln!(output, "FNH:{}", counts.covered);
    }

    fn write_branches(output: &mut String, record: &FileCoverageRecord) {
        for arm in &record.detail().branches {
            // `-` marks an arm whose block never ran
            let taken = if arm.hits == 0 && !Self::block_ran(record, arm.block) {
                "-".to_string()
            } else {
                arm.hits.to_string()
            };
            let _ = writeln!(
                output,
                "BRDA:{},{},{},{}",
                arm.line, arm.block, arm.arm, taken
            );
        }
        let counts = record.counts().branches;
        let _ = writeln!(output, "BRF:{}", counts.total);
        let _ = writeln!(output, "BRH:{}", counts.covered);
    }

    fn write_lines(output: &mut String, record: &FileCoverageRecord) {
        for (line, hit) in record.detail().line_hits() {
            let _ = writeln!(output, "DA:{line},{}", hit.hits);
        }
        let counts = record.counts().lines;
        let _ = writeln!(output, "LF:{}", counts.total);
        let _ = writeln!(output, "LH:{}", counts.covered);
    }

    fn block_ran(record: &FileCoverageRecord, block: u32) -> bool {
        record
            .detail()
            .branches
            .iter()
            .any(|arm| arm.block == block && arm.hits > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::coverage::{
        BranchHit, FileDetail, FunctionHit, MetricCounts, MetricMap, StatementHit,
    };

    fn create_test_payload() -> CoveragePayload {
        let game = FileDetail {
            statements: vec![
                StatementHit {
                    line: 10,
                    hits: 10,
                    skipped: false,
                },
                StatementHit {
                    line: 15,
                    hits: 5,
                    skipped: false,
                },
                StatementHit {
                    line: 20,
                    hits: 0,
                    skipped: false,
                },
            ],
            functions: vec![
                FunctionHit {
                    name: "main".to_string(),
                    line: 10,
                    hits: 10,
                    skipped: false,
                },
                FunctionHit {
                    name: "update".to_string(),
                    line: 20,
                    hits: 0,
                    skipped: false,
                },
            ],
            branches: vec![
                BranchHit {
                    line: 15,
                    block: 0,
                    arm: 0,
                    hits: 5,
                    skipped: false,
                },
                BranchHit {
                    line: 15,
                    block: 0,
                    arm: 1,
                    hits: 0,
                    skipped: false,
                },
                BranchHit {
                    line: 20,
                    block: 1,
                    arm: 0,
                    hits: 0,
                    skipped: false,
                },
            ],
        };
        let player = MetricMap {
            lines: MetricCounts::new(4, 3),
            ..MetricMap::default()
        };
        vec![
            FileCoverageRecord::from_detail("src/game.js", game),
            FileCoverageRecord::from_counts("src/player.js", player),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_generate_empty_report() {
        let payload = CoveragePayload::new();
        assert!(LcovFormatter::new(&payload).generate().is_empty());
    }

    #[test]
    fn test_each_record_starts_with_test_name() {
        let payload = create_test_payload();
        let output = LcovFormatter::new(&payload).generate();
        assert!(output.starts_with("TN:\nSF:src/game.js\n"));
        assert_eq!(output.matches("TN:\n").count(), 2);
    }

    #[test]
    fn test_generate_contains_source_files() {
        let payload = create_test_payload();
        let output = LcovFormatter::new(&payload).generate();
        assert!(output.contains("SF:src/game.js"));
        assert!(output.contains("SF:src/player.js"));
        assert_eq!(output.matches("end_of_record").count(), 2);
    }

    #[test]
    fn test_generate_contains_functions() {
        let payload = create_test_payload();
        let output = LcovFormatter::new(&payload).generate();
        assert!(output.contains("FN:10,main"));
        assert!(output.contains("FNDA:10,main"));
        assert!(output.contains("FNDA:0,update"));
        assert!(output.contains("FNF:2\nFNH:1"));
    }

    #[test]
    fn test_generate_branch_data() {
        let payload = create_test_payload();
        let output = LcovFormatter::new(&payload).generate();
        assert!(output.contains("BRDA:15,0,0,5"));
        assert!(output.contains("BRDA:15,0,1,0"));
        assert!(output.contains("BRDA:20,1,0,-"));
        assert!(output.contains("BRF:3\nBRH:1"));
    }

    #[test]
    fn test_generate_line_hit_counts() {
        let payload = create_test_payload();
        let output = LcovFormatter::new(&payload).generate();
        assert!(output.contains("DA:10,10"));
        assert!(output.contains("DA:15,5"));
        assert!(output.contains("DA:20,0"));
        assert!(output.contains("LF:3\nLH:2"));
    }

    #[test]
    fn test_precounted_record_has_totals_only() {
        let payload = create_test_payload();
        let output = LcovFormatter::new(&payload).generate();
        let player = output.split("SF:src/player.js").nth(1).unwrap();
        assert!(!player.contains("DA:"));
        assert!(player.contains("LF:4\nLH:3"));
    }
}
