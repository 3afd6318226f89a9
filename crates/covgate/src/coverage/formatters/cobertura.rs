//! Cobertura XML Coverage Report Formatter
//!
//! ```xml
//! <?xml version="1.0" ?>
//! <!DOCTYPE coverage SYSTEM "http://cobertura.sourceforge.net/xml/coverage-04.dtd">
//! <coverage line-rate="0.8" branch-rate="0.7" version="1.0">
//!   <packages>
//!     <package name="src" line-rate="0.8" branch-rate="0.7" complexity="0">
//!       <classes>
//!         <class name="game.js" filename="src/game.js" line-rate="0.9">
//!           <lines>
//!             <line number="10" hits="5"/>
//!           </lines>
//!         </class>
//!       </classes>
//!     </package>
//!   </packages>
//! </coverage>
//! ```

use crate::coverage::{
    summarize, total_counts, CoveragePayload, FileCoverageRecord, MetricCounts,
};
use crate::result::CovgateResult;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Files grouped by directory
type PackageMap<'a> = BTreeMap<String, Vec<&'a FileCoverageRecord>>;

/// Cobertura XML format report generator
#[derive(Debug)]
pub struct CoberturaFormatter<'a> {
    payload: &'a CoveragePayload,
    version: String,
}

impl<'a> CoberturaFormatter<'a> {
    /// Create a new Cobertura formatter
    #[must_use]
    pub fn new(payload: &'a CoveragePayload) -> Self {
        Self {
            payload,
            version: "1.0".to_string(),
        }
    }

    /// Set the version string
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Generate Cobertura XML report as a string
    ///
    /// # Errors
    ///
    /// `InvalidPayload` if the project totals overflow.
    pub fn generate(&self) -> CovgateResult<String> {
        let summary = summarize(self.payload)?;
        let packages = self.group_by_package();

        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<!DOCTYPE coverage SYSTEM "http://cobertura.sourceforge.net/xml/coverage-04.dtd">"#,
        );
        xml.push('\n');
        let _ = writeln!(
            xml,
            r#"<coverage line-rate="{:.4}" branch-rate="{:.4}" lines-covered="{}" lines-valid="{}" branches-covered="{}" branches-valid="{}" complexity="0" version="{}">"#,
            summary.lines().pct / 100.0,
            summary.branches().pct / 100.0,
            summary.lines().covered,
            summary.lines().total,
            summary.branches().covered,
            summary.branches().total,
            escape_xml(&self.version),
        );

        xml.push_str("  <packages>\n");

        for (package_name, files) in &packages {
            let counts = total_counts(files.iter().copied())?;

            let _ = writeln!(
                xml,
                r#"    <package name="{}" line-rate="{:.4}" branch-rate="{:.4}" complexity="0">"#,
                escape_xml(package_name),
                rate(counts.lines),
                rate(counts.branches),
            );
            xml.push_str("      <classes>\n");

            for record in files {
                Self::write_class(&mut xml, record);
            }

            xml.push_str("      </classes>\n");
            xml.push_str("    </package>\n");
        }

        xml.push_str("  </packages>\n");
        xml.push_str("</coverage>\n");

        Ok(xml)
    }

    fn write_class(xml: &mut String, record: &FileCoverageRecord) {
        let counts = record.counts();
        let _ = writeln!(
            xml,
            r#"        <class name="{}" filename="{}" line-rate="{:.4}" branch-rate="{:.4}" complexity="0">"#,
            escape_xml(Self::extract_class_name(record.path())),
            escape_xml(record.path()),
            rate(counts.lines),
            rate(counts.branches),
        );

        xml.push_str("          <methods>\n");
        for func in &record.detail().functions {
            let _ = writeln!(
                xml,
                r#"            <method name="{}" hits="{}" signature="" line-rate="{}"/>"#,
                escape_xml(&func.name),
                func.hits,
                if func.hits > 0 { "1.0" } else { "0.0" },
            );
        }
        xml.push_str("          </methods>\n");

        xml.push_str("          <lines>\n");
        let arms_by_line = Self::branch_arms_by_line(record);
        for (line, hit) in record.detail().line_hits() {
            match arms_by_line.get(&line) {
                Some(&(taken, total)) => {
                    let pct = if total == 0 { 100 } else { taken * 100 / total };
                    let _ = writeln!(
                        xml,
                        r#"            <line number="{line}" hits="{}" branch="true" condition-coverage="{pct}% ({taken}/{total})"/>"#,
                        hit.hits,
                    );
                }
                None => {
                    let _ = writeln!(
                        xml,
                        r#"            <line number="{line}" hits="{}" branch="false"/>"#,
                        hit.hits,
                    );
                }
            }
        }
        xml.push_str("          </lines>\n");
        xml.push_str("        </class>\n");
    }

    /// Group files by package (directory)
    fn group_by_package(&self) -> PackageMap<'a> {
        let mut packages: PackageMap<'a> = BTreeMap::new();

        for record in self.payload.records() {
            let package = record
                .path()
                .rsplit_once('/')
                .map_or_else(|| "default".to_string(), |(dir, _)| dir.to_string());
            packages.entry(package).or_default().push(record);
        }

        packages
    }

    /// Extract class name from file path
    fn extract_class_name(file_path: &str) -> &str {
        file_path
            .rsplit_once('/')
            .map_or(file_path, |(_, name)| name)
    }

    /// (taken, total) branch arms per line
    fn branch_arms_by_line(record: &FileCoverageRecord) -> BTreeMap<u32, (u64, u64)> {
        let mut lines: BTreeMap<u32, (u64, u64)> = BTreeMap::new();
        for arm in &record.detail().branches {
            let entry = lines.entry(arm.line).or_default();
            entry.1 += 1;
            if arm.hits > 0 {
                entry.0 += 1;
            }
        }
        lines
    }
}

fn rate(counts: MetricCounts) -> f64 {
    if counts.total == 0 {
        1.0
    } else {
        counts.covered as f64 / counts.total as f64
    }
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
