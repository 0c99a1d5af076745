use lineage_core::config::RiskConfig;
use lineage_core::model::{DatasetRecord, ModelPaperInfo, RiskAssessment, RiskIndicator, RiskLevel};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::warn;

const SYNTHETIC_KEYWORDS: &[&str] = &[
    "synthetic",
    "generated",
    "self-instruct",
    "distilled from",
    "gpt-4",
    "gpt-3.5",
    "chatgpt",
];

static ENGLISH_TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:english|en|us|uk|american|british)\b").expect("english token regex")
});

static LARGE_CRAWLS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:pile|common crawl|commoncrawl|c4|laion|refinedweb|redpajama|openwebtext|fineweb|dolma|oscar)\b",
    )
    .expect("crawl name regex")
});

/// Static heuristic over a dataset's name, description and url.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskEngine {
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, dataset: &DatasetRecord) -> RiskAssessment {
        let name = dataset.name.to_lowercase();
        let text = match &dataset.description {
            Some(description) => format!("{name} {}", description.to_lowercase()),
            None => name.clone(),
        };
        let url_present = dataset
            .url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty());

        let weights = self.config.weights;
        let checks = [
            (
                RiskIndicator::SyntheticSource,
                SYNTHETIC_KEYWORDS.iter().any(|kw| text.contains(kw)),
                weights.synthetic_source,
            ),
            (
                RiskIndicator::EnglishCentric,
                ENGLISH_TOKENS.is_match(&text),
                weights.english_centric,
            ),
            (
                RiskIndicator::KnownLargeCrawl,
                LARGE_CRAWLS.is_match(&name),
                weights.known_large_crawl,
            ),
            (
                RiskIndicator::NoVerifiedSource,
                !url_present,
                weights.no_verified_source,
            ),
        ];

        let mut indicators = BTreeSet::new();
        let mut score = 0;
        for (indicator, fired, weight) in checks {
            if fired {
                indicators.insert(indicator);
                score += weight;
            }
        }

        let risk_level = if indicators.is_empty() {
            indicators.insert(RiskIndicator::NoSpecificFlags);
            RiskLevel::Low
        } else if score >= self.config.high_threshold {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        };

        RiskAssessment {
            risk_level,
            indicators,
            url_present,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDataset {
    #[serde(flatten)]
    pub dataset: DatasetRecord,
    #[serde(flatten)]
    pub assessment: RiskAssessment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRisk {
    pub model_id: String,
    pub arxiv_url: Option<String>,
    pub datasets: Vec<ScoredDataset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GlobalCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub unknown_models: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RiskContext {
    pub models: Vec<ModelRisk>,
    pub global_counts: GlobalCounts,
}

impl RiskContext {
    fn push_model(
        &mut self,
        engine: &RiskEngine,
        model_id: String,
        arxiv_url: Option<String>,
        records: Vec<DatasetRecord>,
    ) {
        let datasets: Vec<ScoredDataset> = records
            .into_iter()
            .map(|dataset| {
                let assessment = engine.score(&dataset);
                ScoredDataset {
                    dataset,
                    assessment,
                }
            })
            .collect();

        if datasets.is_empty() {
            self.global_counts.unknown_models += 1;
        }
        for scored in &datasets {
            match scored.assessment.risk_level {
                RiskLevel::Low => self.global_counts.low += 1,
                RiskLevel::Medium => self.global_counts.medium += 1,
                RiskLevel::High => self.global_counts.high += 1,
            }
        }
        self.models.push(ModelRisk {
            model_id,
            arxiv_url,
            datasets,
        });
    }
}

impl RiskEngine {
    /// Scores a loosely-shaped `{model_id: {arxiv_url, datasets: [...]}}` map.
    /// Anything other than an object yields an empty context.
    pub fn build_risk_context(&self, training_datasets: Option<&Value>) -> RiskContext {
        let mut context = RiskContext::default();
        let Some(models) = training_datasets.and_then(Value::as_object) else {
            return context;
        };

        let mut model_ids: Vec<&String> = models.keys().collect();
        model_ids.sort();
        for model_id in model_ids {
            let entry = &models[model_id.as_str()];
            let arxiv_url = entry
                .get("arxiv_url")
                .and_then(Value::as_str)
                .map(str::to_string);
            let records = entry
                .get("datasets")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(loose_record).collect())
                .unwrap_or_default();
            context.push_model(self, model_id.clone(), arxiv_url, records);
        }
        context
    }

    /// Typed variant over orchestrator output; models in id order.
    pub fn build_from_papers<'a>(
        &self,
        papers: impl IntoIterator<Item = (&'a String, &'a ModelPaperInfo)>,
    ) -> RiskContext {
        let mut sorted: Vec<(&String, &ModelPaperInfo)> = papers.into_iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let mut context = RiskContext::default();
        for (model_id, info) in sorted {
            let records = info.datasets.iter().map(DatasetRecord::from).collect();
            context.push_model(self, model_id.clone(), info.arxiv_url.clone(), records);
        }
        context
    }
}

fn loose_record(item: &Value) -> Option<DatasetRecord> {
    let name = item
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty());
    let Some(name) = name else {
        warn!("skipping dataset entry without a name");
        return None;
    };
    let text = |keys: [&str; 2]| {
        keys.iter()
            .find_map(|key| item.get(*key).and_then(Value::as_str))
            .map(str::to_string)
    };

    let mut record = DatasetRecord::new(name).with_url(text(["url", "hf_url"]));
    record.description = text(["description", "context"]);
    Some(record)
}
