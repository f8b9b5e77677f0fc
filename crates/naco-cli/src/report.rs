//! Output rendering for matched object definitions

use std::collections::HashMap;

use anyhow::Result;
use clap::ValueEnum;
use naco_config::{ObjectDefinition, KEY_WIDTH};
use naco_expr::Expression;

/// How matching object definitions are printed
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    /// Full canonical configuration blocks
    Config,
    /// One-line references (`type 'identifier' at location`)
    Oneline,
    /// Selected directive values only
    Value,
    /// One JSON object per record
    Json,
    /// No record output
    None,
}

/// Metadata printed around matching object definitions
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetadataMode {
    /// `# File:` reference above each block
    File,
    /// `# Filter:` lines naming the filters that matched
    Filter,
    /// Final `# Total:` summary
    Total,
    /// No metadata
    None,
}

/// Accumulates per-record output and the run counters
pub struct Report {
    output: OutputMode,
    select: Vec<String>,
    show_file: bool,
    show_filter: bool,
    show_total: bool,
    limit: usize,
    counts: Vec<(String, HashMap<Option<String>, usize>)>,
    matched: usize,
    total: usize,
}

impl Report {
    #[must_use]
    pub fn new(
        output: OutputMode,
        select: Vec<String>,
        metadata: &[MetadataMode],
        count: &[String],
        limit: usize,
    ) -> Self {
        let muted = metadata.contains(&MetadataMode::None);
        Report {
            output,
            select,
            show_file: !muted && metadata.contains(&MetadataMode::File),
            show_filter: !muted && metadata.contains(&MetadataMode::Filter),
            show_total: !muted && metadata.contains(&MetadataMode::Total),
            limit,
            counts: count
                .iter()
                .map(|directive| (directive.clone(), HashMap::new()))
                .collect(),
            matched: 0,
            total: 0,
        }
    }

    /// Count a record that was parsed, matched or not
    pub fn tally(&mut self) {
        self.total += 1;
    }

    /// Whether the `--limit` match count has been reached
    #[must_use]
    pub fn limit_reached(&self) -> bool {
        self.limit > 0 && self.matched >= self.limit
    }

    /// Render one matched record. `matches` names the filters that
    /// selected it; empty when no filters were given.
    ///
    /// # Errors
    /// Fails when JSON serialization fails.
    pub fn record(&mut self, objdef: &ObjectDefinition, matches: &[&Expression]) -> Result<()> {
        self.matched += 1;

        if !self.counts.is_empty() {
            for (directive, counter) in &mut self.counts {
                let rendered = objdef.get(directive).to_string();
                let key = if rendered.is_empty() { None } else { Some(rendered) };
                *counter.entry(key).or_insert(0) += 1;
            }
            return Ok(());
        }

        match self.output {
            OutputMode::Config => {
                if self.show_filter {
                    for expr in matches {
                        println!("# Filter: {}", expr.source());
                    }
                }
                if self.show_file {
                    println!("# File: {}", objdef.location());
                }
                let selected = self.selected();
                println!("{}", objdef.render_selected(selected));
            }
            OutputMode::Oneline => {
                match objdef.identifier() {
                    Some(identifier) => println!(
                        "{} '{}' at {}",
                        objdef.objtype().name(),
                        identifier,
                        objdef.location()
                    ),
                    None => println!("{} at {}", objdef.objtype().name(), objdef.location()),
                }
                if !self.select.is_empty() {
                    for key in &self.select {
                        let value = objdef.get(key);
                        if value.is_truthy() {
                            println!("    {key:<width$} {value}", width = KEY_WIDTH);
                        }
                    }
                    println!();
                }
            }
            OutputMode::Value => {
                for key in &self.select {
                    let value = objdef.get(key);
                    if value.is_truthy() {
                        println!("{value}");
                    }
                }
            }
            OutputMode::Json => println!("{}", serde_json::to_string(objdef)?),
            OutputMode::None => {}
        }
        Ok(())
    }

    /// Print the count tables and the total summary
    pub fn finish(&self) {
        for (directive, counter) in &self.counts {
            let header = format!("Count: {directive}");
            println!("{header}");
            println!("{}", "=".repeat(header.len()));
            let mut entries: Vec<_> = counter.iter().collect();
            entries.sort_by(|(a_value, a_count), (b_value, b_count)| {
                b_count.cmp(a_count).then_with(|| a_value.cmp(b_value))
            });
            for (value, count) in entries {
                println!("{count:<8} {}", value.as_deref().unwrap_or("-"));
            }
            println!();
        }

        if self.show_total && self.output != OutputMode::Value {
            println!(
                "# Total: {} / {} matching object definition(s)",
                self.matched, self.total
            );
        }
    }

    fn selected(&self) -> Option<&[String]> {
        if self.select.is_empty() {
            None
        } else {
            Some(&self.select)
        }
    }
}
