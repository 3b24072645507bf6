//! Property-based tests for gate reports.
//!
//! Random sequences of rules, each with a known outcome against a fixed
//! dataset, are run through the gate. The resulting report must agree with
//! an independently computed expectation:
//!
//! - `summary.total` equals the number of recorded outcomes
//! - `summary.passed + summary.failed == summary.total`
//! - nothing is recorded after a failing `STOP` rule or an unknown rule type
//! - a run without failures is never aborted
//!
//! Quarantine paths are also checked to stay inside the quarantine root for
//! arbitrary dataset and column names.

use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use proptest::prelude::*;
use std::path::Component;
use std::sync::Arc;
use term_gate::core::QualityGate;
use term_gate::quarantine::{sanitize_component, ParquetQuarantineWriter, QuarantineTarget};
use term_gate::report::MemoryReportSink;
use term_gate::rules::{DataSourceSpec, OnFail, Rule, RuleSet, SourceFormat, ValidationSet};
use term_gate::sources::MemoryLoader;
use term_gate::validators::RuleStatus;

const SOURCE: &str = "mem://orders";

fn orders() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("customer", DataType::Int64, false),
        Field::new("region", DataType::Utf8, true),
        Field::new("amount", DataType::Int64, false),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5, 6])),
            Arc::new(Int64Array::from(vec![10, 10, 11, 12, 13, 13])),
            Arc::new(StringArray::from(vec![
                Some("north"),
                None,
                Some("south"),
                Some("east"),
                Some("west"),
                None,
            ])),
            Arc::new(Int64Array::from(vec![100, 120, 80, 90, 110, 100])),
        ],
    )
    .unwrap()
}

/// A rule template and whether it passes against [`orders`].
#[derive(Debug, Clone, Copy)]
enum Template {
    IdNotNull,
    RegionNotNull,
    IdUnique,
    CustomerUnique,
    AmountMeanInside,
    AmountMeanOutside,
    RegionNullsBelowHalf,
    RegionNullsBelowTenth,
    UnknownType,
}

impl Template {
    fn rule(self) -> Rule {
        match self {
            Template::IdNotNull => Rule::new("is_not_null", "id"),
            Template::RegionNotNull => Rule::new("is_not_null", "region"),
            Template::IdUnique => Rule::new("is_unique", "id"),
            Template::CustomerUnique => Rule::new("is_unique", "customer"),
            Template::AmountMeanInside => Rule::new("mean_is_between", "amount")
                .with_param("min", 90)
                .with_param("max", 110),
            Template::AmountMeanOutside => Rule::new("mean_is_between", "amount")
                .with_param("min", 200)
                .with_param("max", 300),
            Template::RegionNullsBelowHalf => {
                Rule::new("null_percentage_is_less_than", "region").with_param("threshold", 50)
            }
            Template::RegionNullsBelowTenth => {
                Rule::new("null_percentage_is_less_than", "region").with_param("threshold", 10)
            }
            Template::UnknownType => Rule::new("is_positive", "amount"),
        }
    }

    fn passes(self) -> bool {
        matches!(
            self,
            Template::IdNotNull
                | Template::IdUnique
                | Template::AmountMeanInside
                | Template::RegionNullsBelowHalf
        )
    }

    fn always_stops(self) -> bool {
        matches!(self, Template::UnknownType)
    }
}

fn template_strategy() -> impl Strategy<Value = Template> {
    prop_oneof![
        Just(Template::IdNotNull),
        Just(Template::RegionNotNull),
        Just(Template::IdUnique),
        Just(Template::CustomerUnique),
        Just(Template::AmountMeanInside),
        Just(Template::AmountMeanOutside),
        Just(Template::RegionNullsBelowHalf),
        Just(Template::RegionNullsBelowTenth),
        Just(Template::UnknownType),
    ]
}

fn on_fail_strategy() -> impl Strategy<Value = OnFail> {
    prop_oneof![3 => Just(OnFail::Warn), 1 => Just(OnFail::Stop)]
}

/// Expected (passed, failed, aborted) for a sequence of sets.
fn expected(sets: &[Vec<(Template, OnFail)>]) -> (usize, usize, bool) {
    let (mut passed, mut failed) = (0, 0);
    for set in sets {
        for (template, on_fail) in set {
            if template.passes() {
                passed += 1;
                continue;
            }
            failed += 1;
            if template.always_stops() || *on_fail == OnFail::Stop {
                return (passed, failed, true);
            }
        }
    }
    (passed, failed, false)
}

fn rule_set(sets: &[Vec<(Template, OnFail)>]) -> RuleSet {
    RuleSet::new(
        sets.iter()
            .enumerate()
            .map(|(idx, rules)| {
                rules.iter().fold(
                    ValidationSet::new(
                        format!("orders_{idx}"),
                        DataSourceSpec::new(SOURCE, SourceFormat::Parquet),
                    ),
                    |set, (template, on_fail)| set.rule(template.rule().on_fail(*on_fail)),
                )
            })
            .collect(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_report_matches_expected_outcomes(
        sets in prop::collection::vec(
            prop::collection::vec((template_strategy(), on_fail_strategy()), 0..5),
            1..4,
        )
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let quarantine = tempfile::tempdir().unwrap();
            let sink = MemoryReportSink::new();
            let gate = QualityGate::builder()
                .loader(MemoryLoader::new().with_batch(SOURCE, orders()))
                .quarantine(ParquetQuarantineWriter::new(quarantine.path()))
                .report_sink(sink.clone())
                .build()
                .unwrap();

            let run = gate.run(&rule_set(&sets)).await.unwrap();
            let report = &run.report;
            let (passed, failed, aborted) = expected(&sets);

            prop_assert_eq!(report.summary.total, report.details.len());
            prop_assert_eq!(report.summary.passed + report.summary.failed, report.summary.total);
            prop_assert_eq!(report.summary.passed, passed);
            prop_assert_eq!(report.summary.failed, failed);
            prop_assert_eq!(report.aborted, aborted);
            prop_assert_eq!(report.abort_reason.is_some(), aborted);

            if report.summary.failed == 0 {
                prop_assert!(!report.aborted);
            }
            if aborted {
                let last = report.details.last().unwrap();
                prop_assert_eq!(last.status, RuleStatus::Fail);
            }

            let evaluated: usize = report.datasets.iter().map(|d| d.rules_evaluated).sum();
            prop_assert_eq!(evaluated, report.summary.total);
            prop_assert_eq!(sink.reports().len(), 1);
            Ok(())
        })?;
    }

    #[test]
    fn prop_quarantine_dir_stays_under_root(
        dataset in "[a-zA-Z0-9 ./\\\\_-]{0,16}",
        column in "[a-zA-Z0-9 ./\\\\_-]{0,16}",
    ) {
        let target = QuarantineTarget::new(&dataset, "is_unique", &column);
        let relative = target.relative_dir();

        prop_assert_eq!(relative.components().count(), 2);
        for component in relative.components() {
            prop_assert!(matches!(component, Component::Normal(_)));
        }
        prop_assert_eq!(
            relative.components().next().unwrap().as_os_str().to_string_lossy().to_string(),
            sanitize_component(&dataset)
        );
    }
}
