//! Runs a quality gate over a small customer file.
//!
//! ```text
//! cargo run --example customer_gate
//! cargo run --example customer_gate -- rules.yaml config.yaml
//! ```
//!
//! Without arguments a sample CSV, rule document and configuration are
//! written to a temporary directory first. The exit code is 1 when the run
//! was aborted by a `STOP` rule.

use std::path::Path;
use term_gate::config::GateConfig;
use term_gate::formatters::HumanFormatter;
use term_gate::logging::setup::{init_logging, LoggingConfig};
use term_gate::prelude::*;

const CUSTOMERS: &str = "\
customer_id,name,state,age
1,Ana,SP,25
2,Bruno,,30
2,Carla,RJ,35
3,Davi,MG,30
4,Eva,SP,30
";

fn write_sample(dir: &Path) -> std::io::Result<(String, String)> {
    let data = dir.join("customers_v2.csv");
    std::fs::write(&data, CUSTOMERS)?;

    let rules = dir.join("rules.yaml");
    std::fs::write(
        &rules,
        format!(
            r#"validation_sets:
  - dataset_name: Clientes
    data_source_path: {}
    data_source_format: csv
    rules:
      - rule_type: null_percentage_is_less_than
        column: state
        params:
          threshold: 15
      - rule_type: mean_is_between
        column: age
        params:
          min: 20
          max: 40
      - rule_type: is_unique
        column: customer_id
        on_fail: STOP
        quarantine: true
"#,
            data.display()
        ),
    )?;

    let config = dir.join("config.yaml");
    std::fs::write(
        &config,
        format!(
            "pipeline_name: CustomerGate\nlog_level: INFO\npaths:\n  report_path: {}\n  quarantine_path: {}\n",
            dir.join("reports").display(),
            dir.join("quarantine").display()
        ),
    )?;

    Ok((
        rules.display().to_string(),
        config.display().to_string(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let sample_dir = std::env::temp_dir().join("term-gate-demo");

    let (rules_path, config_path) = match args.as_slice() {
        [rules, config] => (rules.clone(), config.clone()),
        _ => {
            std::fs::create_dir_all(&sample_dir)?;
            write_sample(&sample_dir)?
        }
    };

    let config = GateConfig::from_path(&config_path)?;
    init_logging(LoggingConfig::from_gate_config(&config)?)?;

    let rules = RuleSet::from_path(&rules_path)?;
    let gate = QualityGate::from_config(&config)?;
    let run = gate.run(&rules).await?;

    println!("{}", HumanFormatter::new().format(&run.report)?);
    println!("Report written to {}", run.report_path);

    if run.report.aborted {
        std::process::exit(1);
    }
    Ok(())
}
