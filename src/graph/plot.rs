use std::fs;
use std::path::Path;
use std::process::Command;

use super::tape::{Record, Source, Tape};

/// Tape visualization: GraphViz DOT output and console dumps.
#[derive(Debug, Clone, Default)]
pub struct TapeVisualizer {
    pub config: VisualizationConfig,
}

/// Configuration for tape visualization
#[derive(Debug, Clone)]
pub struct VisualizationConfig {
    pub show_shapes: bool,
    pub show_values: bool,
    /// Draw untracked arguments as their own boxes.
    pub show_constants: bool,
    pub max_value_display: usize,
    pub leaf_color: String,
    pub branch_color: String,
    pub constant_color: String,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            show_shapes: true,
            show_values: false, // values clutter anything but toy tapes
            show_constants: true,
            max_value_display: 5,
            leaf_color: "#E8F5E8".to_string(),
            branch_color: "#FFF3E0".to_string(),
            constant_color: "#E3F2FD".to_string(),
        }
    }
}

impl TapeVisualizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: VisualizationConfig) -> Self {
        Self { config }
    }

    /// Generate DOT format representation of the whole tape
    pub fn to_dot(&self, tape: &Tape) -> String {
        let mut dot = String::new();
        dot.push_str("digraph Tape {\n");
        dot.push_str("    rankdir=TB;\n");
        dot.push_str("    node [shape=box, style=filled];\n");
        dot.push_str("    edge [color=gray];\n");

        for (position, record) in tape.records().iter().enumerate() {
            let label = self.label(position, record);
            let color = match record.as_ref() {
                Record::Leaf(_) => &self.config.leaf_color,
                Record::Branch(_) => &self.config.branch_color,
            };
            dot.push_str(&format!(
                "    n{} [label=\"{}\", fillcolor=\"{}\"];\n",
                position, label, color
            ));

            if let Record::Branch(branch) = record.as_ref() {
                let inputs = branch.sources().iter().zip(branch.args()).enumerate();
                for (index, (source, value)) in inputs {
                    match source {
                        Source::Tracked(input) => {
                            dot.push_str(&format!("    n{} -> n{};\n", input, position));
                        }
                        Source::Plain if self.config.show_constants => {
                            dot.push_str(&format!(
                                "    c{}_{} [label=\"const\\n{:?}\", fillcolor=\"{}\"];\n",
                                position,
                                index,
                                value.shape(),
                                self.config.constant_color
                            ));
                            dot.push_str(&format!(
                                "    c{}_{} -> n{} [style=dashed];\n",
                                position, index, position
                            ));
                        }
                        Source::Plain => {}
                    }
                }
            }
        }

        dot.push_str("}\n");
        dot
    }

    fn label(&self, position: usize, record: &Record) -> String {
        let mut label = match record {
            Record::Leaf(_) => format!("%{}\\nleaf", position),
            Record::Branch(branch) => format!("%{}\\n{}", position, branch.name()),
        };

        if self.config.show_shapes {
            label.push_str(&format!("\\nShape: {:?}", record.value().shape()));
        }

        if self.config.show_values && record.value().len() <= self.config.max_value_display {
            label.push_str(&format!("\\nData: {:?}", record.value().to_vec()));
        }

        label
    }

    /// Save the tape as a DOT file
    pub fn save_dot(&self, tape: &Tape, filename: impl AsRef<Path>) -> std::io::Result<()> {
        fs::write(filename, self.to_dot(tape))
    }

    /// Generate and save the tape as an image (requires Graphviz)
    pub fn save_image(
        &self,
        tape: &Tape,
        filename: &str,
        format: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let temp_dot = format!("{}.dot", filename);
        self.save_dot(tape, &temp_dot)?;

        let output = Command::new("dot")
            .arg(format!("-T{}", format))
            .arg(&temp_dot)
            .arg("-o")
            .arg(filename)
            .output();
        // The intermediate file goes away whether or not Graphviz succeeded.
        fs::remove_file(&temp_dot)?;

        let output = output?;
        if !output.status.success() {
            return Err(format!(
                "Graphviz failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )
            .into());
        }
        Ok(())
    }

    /// Print the tape to console (simple text representation)
    pub fn print_tape(&self, tape: &Tape) {
        println!("Tape:");
        println!("=====");
        for (position, record) in tape.records().iter().enumerate() {
            println!("{}", self.label(position, record).replace("\\n", " "));
        }
    }
}

// Extension trait to add visualization methods directly to Tape
pub trait TapeVisualization {
    fn visualize(&self) -> TapeVisualizer;
    fn plot_tape(&self);
    fn save_tape_dot(&self, filename: &str) -> std::io::Result<()>;
}

impl TapeVisualization for Tape {
    fn visualize(&self) -> TapeVisualizer {
        TapeVisualizer::new()
    }

    fn plot_tape(&self) {
        TapeVisualizer::new().print_tape(self);
    }

    fn save_tape_dot(&self, filename: &str) -> std::io::Result<()> {
        TapeVisualizer::new().save_dot(self, filename)
    }
}
