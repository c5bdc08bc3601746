//! Knowledge base: the single authoritative advisory table.
//!
//! Primary language is English, secondary is Hindi. The table is an
//! exhaustive `match` over [`Category`], so adding a category without an
//! advisory is a compile error. Labels outside the closed set resolve to
//! [`AdvisoryTemplate::UNKNOWN`] (`treat = false`, empty text).

use serde::Serialize;

use super::category::Category;

/// How urgently a category needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    None,
    Moderate,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "None",
            Severity::Moderate => "Moderate",
            Severity::High => "High",
        }
    }
}

/// Immutable per-category advisory bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvisoryTemplate {
    /// Whether the crop should be treated (sprayed) now.
    pub treat: bool,
    pub guidance_primary: &'static str,
    pub guidance_secondary: &'static str,
    pub agent_primary: &'static str,
    pub agent_secondary: &'static str,
    pub severity: Severity,
    /// What the condition looks like; display text.
    pub description_primary: &'static str,
    pub description_secondary: &'static str,
}

impl AdvisoryTemplate {
    /// Fail-closed template for labels outside the closed category set.
    pub const UNKNOWN: AdvisoryTemplate = AdvisoryTemplate {
        treat: false,
        guidance_primary: "",
        guidance_secondary: "",
        agent_primary: "",
        agent_secondary: "",
        severity: Severity::None,
        description_primary: "",
        description_secondary: "",
    };
}

const NONE_REQUIRED_EN: &str = "None required";
const NONE_REQUIRED_HI: &str = "आवश्यकता नहीं";

static APHIDS: AdvisoryTemplate = AdvisoryTemplate {
    treat: true,
    guidance_primary: "Use insecticidal soap or neem oil. Introduce natural predators like ladybugs.",
    guidance_secondary: "कीटनाशक साबुन या नीम का तेल उपयोग करें। लेडीबग जैसे प्राकृतिक शिकारियों को पेश करें।",
    agent_primary: "Imidacloprid, Acetamiprid, or Thiamethoxam",
    agent_secondary: "इमिडाक्लोप्रिड, एसिटामिप्रिड, या थायमेथोक्सम",
    severity: Severity::Moderate,
    description_primary: "Small sap-sucking insects that weaken plants. They cause curling and yellowing of leaves.",
    description_secondary: "छोटे कीट जो पौधों का रस चूसते हैं और पौधों को कमजोर करते हैं। वे पत्तियों के मुड़ने और पीले पड़ने का कारण बनते हैं।",
};

static ARMY_WORM: AdvisoryTemplate = AdvisoryTemplate {
    treat: true,
    guidance_primary: "Handpick worms or use biological controls like Bacillus thuringiensis (Bt).",
    guidance_secondary: "हाथ से इल्लियों को उठाएं या बैसिलस थुरिंजिएन्सिस (Bt) जैसे जैविक नियंत्रण का उपयोग करें।",
    agent_primary: "Chlorantraniliprole, Spinosad, or Emamectin benzoate",
    agent_secondary: "क्लोरान्ट्रानिलिप्रोल, स्पिनोसैड, या इमामेक्टिन बेंजोएट",
    severity: Severity::High,
    description_primary: "Caterpillars that feed on leaves and can defoliate plants completely.",
    description_secondary: "इल्लियाँ जो पत्तियों को खाती हैं और पौधों को पूरी तरह से पत्तीविहीन कर सकती हैं।",
};

static BACTERIAL_BLIGHT: AdvisoryTemplate = AdvisoryTemplate {
    treat: true,
    guidance_primary: "Remove infected plants. Use copper-based bactericides and practice crop rotation.",
    guidance_secondary: "संक्रमित पौधों को हटा दें। तांबा-आधारित जीवाणुनाशक का उपयोग करें और फसल चक्रण का अभ्यास करें।",
    agent_primary: "Copper oxychloride, Streptomycin, or Kasugamycin",
    agent_secondary: "कॉपर ऑक्सीक्लोराइड, स्ट्रेप्टोमाइसिन, या कासुगामाइसिन",
    severity: Severity::High,
    description_primary: "Bacterial disease causing water-soaked lesions that turn brown and angular leaf spots.",
    description_secondary: "जीवाणु जनित रोग जो पानी से भरे घाव पैदा करता है जो भूरे हो जाते हैं और कोणीय पत्ती के धब्बे पैदा करते हैं।",
};

static COTTON_BOLL_ROT: AdvisoryTemplate = AdvisoryTemplate {
    treat: true,
    guidance_primary: "Improve air circulation. Avoid overhead irrigation. Apply fungicides during flowering.",
    guidance_secondary: "हवा के संचार में सुधार करें। ऊपरी सिंचाई से बचें। फूल आने के दौरान कवकनाशी लगाएं।",
    agent_primary: "Carbendazim, Mancozeb, or Propiconazole",
    agent_secondary: "कार्बेन्डाजिम, मैंकोजेब, या प्रोपिकोनाजोल",
    severity: Severity::Moderate,
    description_primary: "Fungal disease causing bolls to rot and turn black. Favored by humid conditions.",
    description_secondary: "फफूंदी जनित रोग जो टिंडों को सड़ने और काला करने का कारण बनता है। आर्द्र परिस्थितियों में फलता-फूलता है।",
};

static GREEN_COTTON_BOLL: AdvisoryTemplate = AdvisoryTemplate {
    treat: false,
    guidance_primary: "No treatment needed. Maintain good agricultural practices.",
    guidance_secondary: "किसी उपचार की आवश्यकता नहीं है। अच्छी कृषि पद्धतियों को बनाए रखें।",
    agent_primary: NONE_REQUIRED_EN,
    agent_secondary: NONE_REQUIRED_HI,
    severity: Severity::None,
    description_primary: "Healthy cotton boll in development stage. No treatment needed.",
    description_secondary: "विकास के चरण में स्वस्थ कपास की टिंडी। किसी उपचार की आवश्यकता नहीं है।",
};

static HEALTHY: AdvisoryTemplate = AdvisoryTemplate {
    treat: false,
    guidance_primary: "No treatment needed. Continue with regular monitoring and good agricultural practices.",
    guidance_secondary: "किसी उपचार की आवश्यकता नहीं है। नियमित निगरानी और अच्छी कृषि पद्धतियों को जारी रखें।",
    agent_primary: NONE_REQUIRED_EN,
    agent_secondary: NONE_REQUIRED_HI,
    severity: Severity::None,
    description_primary: "Healthy cotton plant with no signs of disease. Continue good practices.",
    description_secondary: "स्वस्थ कपास का पौधा जिसमें रोग के कोई लक्षण नहीं हैं। अच्छी प्रथाएं जारी रखें।",
};

static POWDERY_MILDEW: AdvisoryTemplate = AdvisoryTemplate {
    treat: true,
    guidance_primary: "Improve air circulation. Apply sulfur-based or systemic fungicides.",
    guidance_secondary: "हवा के संचार में सुधार करें। गंधक-आधारित या प्रणालीगत कवकनाशी लगाएं।",
    agent_primary: "Sulfur, Myclobutanil, or Tebuconazole",
    agent_secondary: "सल्फर, माइक्लोब्यूटानिल, या टेबुकोनाजोल",
    severity: Severity::Moderate,
    description_primary: "Fungal disease appearing as white powdery spots on leaves and stems.",
    description_secondary: "फफूंदी जनित रोग जो पत्तियों और तनों पर सफेद पाउडर जैसे धब्बे के रूप में दिखाई देता है।",
};

static TARGET_SPOT: AdvisoryTemplate = AdvisoryTemplate {
    treat: true,
    guidance_primary: "Remove infected leaves. Apply fungicides and practice crop rotation.",
    guidance_secondary: "संक्रमित पत्तियों को हटा दें। कवकनाशी लगाएं और फसल चक्रण का अभ्यास करें।",
    agent_primary: "Chlorothalonil, Azoxystrobin, or Pyraclostrobin",
    agent_secondary: "क्लोरोथैलोनिल, एज़ोक्सिस्ट्रोबिन, या पाइराक्लोस्ट्रोबिन",
    severity: Severity::Moderate,
    description_primary: "Fungal disease causing target-like spots with concentric rings on leaves.",
    description_secondary: "फफूंदी जनित रोग जो पत्तियों पर निशाने जैसे धब्बे पैदा करता है जिनमें संकेंद्रित वलय होते हैं।",
};

static UNKNOWN: AdvisoryTemplate = AdvisoryTemplate::UNKNOWN;

/// One row of the knowledge base, as served to display consumers.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeEntry {
    pub category: Category,
    #[serde(flatten)]
    pub template: &'static AdvisoryTemplate,
}

/// Read-only category → advisory mapping.
///
/// Stateless; every instance sees the same process-wide table.
#[derive(Debug, Clone, Copy, Default)]
pub struct KnowledgeBase;

impl KnowledgeBase {
    pub fn new() -> Self {
        KnowledgeBase
    }

    /// Advisory for a known category. Total over the closed set.
    pub fn template(&self, category: Category) -> &'static AdvisoryTemplate {
        match category {
            Category::Aphids => &APHIDS,
            Category::ArmyWorm => &ARMY_WORM,
            Category::BacterialBlight => &BACTERIAL_BLIGHT,
            Category::CottonBollRot => &COTTON_BOLL_ROT,
            Category::GreenCottonBoll => &GREEN_COTTON_BOLL,
            Category::Healthy => &HEALTHY,
            Category::PowderyMildew => &POWDERY_MILDEW,
            Category::TargetSpot => &TARGET_SPOT,
        }
    }

    /// Advisory for an optional category; `None` fails closed.
    pub fn lookup(&self, category: Option<Category>) -> &'static AdvisoryTemplate {
        match category {
            Some(category) => self.template(category),
            None => &UNKNOWN,
        }
    }

    /// Advisory for a raw classifier label; unknown labels fail closed.
    pub fn lookup_label(&self, label: &str) -> &'static AdvisoryTemplate {
        self.lookup(Category::from_label(label))
    }

    /// Full table in classifier index order.
    pub fn categories(&self) -> Vec<KnowledgeEntry> {
        Category::ALL
            .into_iter()
            .map(|category| KnowledgeEntry {
                category,
                template: self.template(category),
            })
            .collect()
    }
}
