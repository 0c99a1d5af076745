use regex::Regex;
use std::sync::LazyLock;

/// Display name and accepted spellings of well-known training datasets.
const KNOWN_DATASETS: &[(&str, &[&str])] = &[
    ("ImageNet", &["imagenet", "imagenet-1k", "imagenet-21k"]),
    ("COCO", &["coco", "ms-coco", "ms coco"]),
    ("SQuAD", &["squad"]),
    ("GLUE", &["glue"]),
    ("SuperGLUE", &["superglue"]),
    ("C4", &["c4", "colossal clean crawled corpus"]),
    ("The Pile", &["the pile"]),
    ("Common Crawl", &["common crawl", "commoncrawl"]),
    ("BookCorpus", &["bookcorpus", "books corpus"]),
    ("Wikipedia", &["wikipedia"]),
    ("OpenWebText", &["openwebtext"]),
    ("LAION", &["laion-5b", "laion-400m", "laion"]),
    ("MNIST", &["mnist"]),
    ("CIFAR", &["cifar-10", "cifar-100", "cifar"]),
    ("MS MARCO", &["ms marco", "msmarco"]),
    ("Natural Questions", &["natural questions"]),
    ("TriviaQA", &["triviaqa"]),
    ("RedPajama", &["redpajama"]),
    ("RefinedWeb", &["refinedweb"]),
    ("Dolma", &["dolma"]),
    ("FineWeb", &["fineweb"]),
    ("Alpaca", &["alpaca"]),
    ("ShareGPT", &["sharegpt"]),
    ("OpenAssistant", &["openassistant", "oasst1"]),
    ("WikiText", &["wikitext-103", "wikitext"]),
    ("MMLU", &["mmlu"]),
    ("GSM8K", &["gsm8k"]),
    ("HumanEval", &["humaneval"]),
    ("The Stack", &["the stack"]),
    ("LibriSpeech", &["librispeech"]),
];

pub struct CatalogEntry {
    pub name: &'static str,
    pattern: Regex,
}

impl CatalogEntry {
    /// Byte range of the first mention in `text`.
    pub fn find(&self, text: &str) -> Option<(usize, usize)> {
        self.pattern.find(text).map(|m| (m.start(), m.end()))
    }

    /// Byte ranges of every mention in `text`.
    pub fn find_all<'a>(&'a self, text: &'a str) -> impl Iterator<Item = (usize, usize)> + 'a {
        self.pattern.find_iter(text).map(|m| (m.start(), m.end()))
    }
}

static CATALOG: LazyLock<Vec<CatalogEntry>> = LazyLock::new(|| {
    KNOWN_DATASETS
        .iter()
        .filter_map(|(name, spellings)| {
            let alternatives: Vec<String> = spellings.iter().map(|s| regex::escape(s)).collect();
            Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))
                .ok()
                .map(|pattern| CatalogEntry { name, pattern })
        })
        .collect()
});

pub fn known_datasets() -> &'static [CatalogEntry] {
    &CATALOG
}
