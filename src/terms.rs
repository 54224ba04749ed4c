//! Domain-term preservation for the translation pipeline.
//!
//! Medical terms are swapped for reserved placeholder tokens before a text is
//! handed to the translation model, so the model cannot mangle them. After
//! translation the placeholders are substituted back as
//! `<Vietnamese form> (<original term>)`, keeping the terminology bilingual.
//! Terms without a glossary entry are restored verbatim.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Enumerable vocabulary of medical terms to preserve. Matching is
/// case-insensitive and whole-word; multi-word entries are matched as
/// contiguous phrases.
const VOCABULARY: &[&str] = &[
    "antibiotic",
    "antibiotics",
    "medication",
    "medicine",
    "drug",
    "drugs",
    "prescription",
    "dose",
    "dosage",
    "symptom",
    "symptoms",
    "diagnosis",
    "treatment",
    "therapy",
    "surgery",
    "hospital",
    "doctor",
    "physician",
    "nurse",
    "patient",
    "disease",
    "illness",
    "infection",
    "virus",
    "bacteria",
    "cancer",
    "diabetes",
    "hypertension",
    "blood pressure",
    "heart rate",
    "temperature",
    "fever",
    "pain",
    "headache",
    "migraine",
    "asthma",
    "pneumonia",
    "bronchitis",
    "flu",
    "covid",
    "coronavirus",
    "vaccine",
    "vaccination",
    "immune",
    "immunity",
    "allergy",
    "allergic",
    "chronic",
    "acute",
    "syndrome",
    "disorder",
    "condition",
    "medical",
    "clinical",
    "pharmaceutical",
    "pharmacology",
    "pathology",
    "radiology",
    "cardiology",
    "neurology",
    "oncology",
    "pediatric",
    "geriatric",
    "anesthesia",
    "surgical",
    "operation",
    "procedure",
    "biopsy",
    "scan",
    "x-ray",
    "mri",
    "ct scan",
    "ultrasound",
    "ecg",
    "ekg",
    "blood test",
    "urine test",
    "cholesterol",
    "glucose",
    "insulin",
    "hormone",
    "vitamin",
    "mineral",
    "supplement",
    "tablet",
    "capsule",
    "injection",
    "intravenous",
    "oral",
    "topical",
    "inhaler",
    "nebulizer",
    "stethoscope",
    "thermometer",
    "syringe",
    "bandage",
    "wound",
    "cut",
    "bruise",
    "fracture",
    "sprain",
    "strain",
    "burn",
    "rash",
    "swelling",
    "inflammation",
    "bleeding",
    "nausea",
    "vomiting",
    "diarrhea",
    "constipation",
    "fatigue",
    "dizziness",
    "shortness of breath",
    "chest pain",
    "abdominal pain",
    "back pain",
    "joint pain",
    "muscle pain",
    "side effects",
    "adverse reaction",
    "contraindication",
    "indication",
    "prognosis",
    "recovery",
    "rehabilitation",
    "physical therapy",
    "occupational therapy",
    "mental health",
    "depression",
    "anxiety",
    "stress",
    "insomnia",
    "sleep disorder",
    "eating disorder",
    "substance abuse",
    "addiction",
    "withdrawal",
    "detox",
    "overdose",
    "emergency",
    "urgent care",
    "icu",
    "intensive care",
    "ambulance",
    "paramedic",
    "first aid",
    "cpr",
    "aed",
    "defibrillator",
];

/// Static bilingual glossary (English term, Vietnamese form). Terms missing
/// here are restored verbatim.
const GLOSSARY: &[(&str, &str)] = &[
    ("antibiotic", "thuốc kháng sinh"),
    ("antibiotics", "thuốc kháng sinh"),
    ("medication", "thuốc"),
    ("medicine", "thuốc"),
    ("drug", "thuốc"),
    ("drugs", "thuốc"),
    ("prescription", "đơn thuốc"),
    ("dose", "liều"),
    ("dosage", "liều lượng"),
    ("symptom", "triệu chứng"),
    ("symptoms", "triệu chứng"),
    ("diagnosis", "chẩn đoán"),
    ("treatment", "điều trị"),
    ("therapy", "liệu pháp"),
    ("surgery", "phẫu thuật"),
    ("hospital", "bệnh viện"),
    ("doctor", "bác sĩ"),
    ("physician", "bác sĩ"),
    ("nurse", "y tá"),
    ("patient", "bệnh nhân"),
    ("disease", "bệnh"),
    ("illness", "bệnh tật"),
    ("infection", "nhiễm trùng"),
    ("virus", "vi-rút"),
    ("bacteria", "vi khuẩn"),
    ("cancer", "ung thư"),
    ("diabetes", "tiểu đường"),
    ("hypertension", "tăng huyết áp"),
    ("blood pressure", "huyết áp"),
    ("heart rate", "nhịp tim"),
    ("temperature", "nhiệt độ"),
    ("fever", "sốt"),
    ("pain", "đau"),
    ("headache", "đau đầu"),
    ("migraine", "đau nửa đầu"),
    ("asthma", "hen suyễn"),
    ("pneumonia", "viêm phổi"),
    ("bronchitis", "viêm phế quản"),
    ("flu", "cúm"),
    ("covid", "COVID"),
    ("coronavirus", "vi-rút corona"),
    ("vaccine", "vắc-xin"),
    ("vaccination", "tiêm chủng"),
    ("immune", "miễn dịch"),
    ("immunity", "miễn dịch"),
    ("allergy", "dị ứng"),
    ("allergic", "dị ứng"),
    ("chronic", "mãn tính"),
    ("acute", "cấp tính"),
    ("syndrome", "hội chứng"),
    ("disorder", "rối loạn"),
    ("condition", "tình trạng"),
    ("medical", "y tế"),
    ("clinical", "lâm sàng"),
    ("emergency", "cấp cứu"),
    ("first aid", "sơ cứu"),
];

/// Vocabulary sorted longest-first so multi-word phrases win over their
/// single-word components.
static SORTED_VOCABULARY: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    let mut terms: Vec<&'static str> = VOCABULARY.to_vec();
    terms.sort_by(|a, b| b.len().cmp(&a.len()));
    terms
});

static GLOSSARY_INDEX: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    GLOSSARY
        .iter()
        .map(|(term, vietnamese)| (term.to_lowercase(), *vietnamese))
        .collect()
});

/// Ordered mapping from placeholder token to the original (case-preserving)
/// term it replaced. One entry per occurrence, not per unique term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermMap {
    entries: Vec<(String, String)>,
}

impl TermMap {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, String)> {
        self.entries.iter()
    }

    fn push(&mut self, placeholder: String, original: String) {
        self.entries.push((placeholder, original));
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
}

/// Replace every vocabulary occurrence in `text` with a reserved
/// `__TERM_<n>__` placeholder and record the originals in order.
pub fn extract(text: &str) -> (String, TermMap) {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut map = TermMap::default();

    let mut i = 0;
    'scan: while i < bytes.len() {
        let at_word_start = i == 0 || !is_word_byte(bytes[i - 1]);
        if at_word_start && bytes[i].is_ascii_alphabetic() {
            for term in SORTED_VOCABULARY.iter() {
                let t = term.as_bytes();
                let end = i + t.len();
                if end <= bytes.len()
                    && bytes[i..end].eq_ignore_ascii_case(t)
                    && (end == bytes.len() || !is_word_byte(bytes[end]))
                {
                    let placeholder = format!("__TERM_{}__", map.len());
                    out.push_str(&placeholder);
                    map.push(placeholder, text[i..end].to_string());
                    i = end;
                    continue 'scan;
                }
            }
        }

        // A matched region is pure ASCII, so unmatched positions may still
        // start a multi-byte character; advance one full char.
        let ch = text[i..].chars().next().unwrap_or('\u{FFFD}');
        out.push(ch);
        i += ch.len_utf8();
    }

    (out, map)
}

/// Substitute placeholders back using the static bilingual glossary.
pub fn restore(text: &str, map: &TermMap) -> String {
    restore_with(text, map, |term| {
        GLOSSARY_INDEX
            .get(&term.to_lowercase())
            .map(|v| v.to_string())
    })
}

/// Substitute placeholders back using a caller-supplied glossary lookup.
/// A `Some(localized)` result yields `localized (original)`; `None` restores
/// the original term verbatim.
pub fn restore_with<F>(text: &str, map: &TermMap, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = text.to_string();
    for (placeholder, original) in map.iter() {
        let replacement = match lookup(original) {
            Some(localized) => format!("{} ({})", localized, original),
            None => original.clone(),
        };
        out = out.replace(placeholder, &replacement);
    }
    out
}
