//! Engineering visualization templates for image prompts
//!
//! A template is picked by keyword containment against the lowercased
//! utterance, first template in declaration order wins. Parameters are pulled
//! out of the utterance with ordered capture patterns; anything not found
//! falls back to the template's defaults.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Where an unextracted parameter gets its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDefault {
    Literal(&'static str),
    /// Copy another, already-resolved parameter
    SameAs(&'static str),
}

/// One prose template with named `{PLACEHOLDER}`s
#[derive(Debug, Clone, Serialize)]
pub struct EngineeringTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub template: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_materials: Option<&'static str>,
    pub keywords: &'static [&'static str],
    #[serde(skip)]
    pub defaults: &'static [(&'static str, ParamDefault)],
}

const CAD_MATERIALS: &str =
    "brushed steel, anodized aluminum, cast iron, rubber seals, industrial plastic";

/// Declaration order is match priority
pub static TEMPLATES: &[EngineeringTemplate] = &[
    EngineeringTemplate {
        id: "engineering_cad",
        name: "Engineering CAD Visualization",
        description: "High-quality industrial CAD rendering untuk komponen teknik",
        template: "High-detail industrial CAD rendering of {OBJECT_NAME}, designed for {TECHNICAL_FUNCTION}, following mechanical engineering standards.

The model is created in professional CAD style (SolidWorks / AutoCAD / Fusion 360 / CATIA), with precise dimensions, correct tolerances, and realistic mechanical assembly.

Features include accurate geometry, sharp edges, chamfers, fillets, bolt holes, threads, bearings, and mounting points, fully aligned and manufacturable.

Rendered in industrial environment, neutral background, engineering visualization, no artistic distortion.

Materials are physically accurate: {MATERIALS}.

Lighting is technical and uniform, emphasizing edges, depth, and part separation.

Style is technical documentation quality, clean, professional, realistic, suitable for manufacturing and engineering review.

{ADDITIONAL_SPECS}",
        default_materials: Some(CAD_MATERIALS),
        keywords: &[
            "cad", "engineering", "mechanical", "teknik", "mesin", "komponen", "part", "assembly",
            "reactor", "reaktor", "furnace", "valve", "pump", "pompa", "tank", "tangki",
            "electrolyzer", "elektroliser", "fuel cell", "heat exchanger", "penukar panas",
            "piping", "pipa", "flange", "bearing", "gear", "shaft", "motor",
        ],
        defaults: &[
            ("TECHNICAL_FUNCTION", ParamDefault::Literal("industrial application and manufacturing")),
            ("MATERIALS", ParamDefault::Literal(CAD_MATERIALS)),
            ("ADDITIONAL_SPECS", ParamDefault::Literal("")),
        ],
    },
    EngineeringTemplate {
        id: "hydrogen_equipment",
        name: "Hydrogen Equipment Visualization",
        description: "Visualisasi peralatan produksi dan penyimpanan hidrogen",
        template: "High-detail industrial visualization of {OBJECT_NAME}, a hydrogen {EQUIPMENT_TYPE} system designed for {TECHNICAL_FUNCTION}.

Professional engineering rendering showing:
- Main components: {MAIN_COMPONENTS}
- Operating conditions: {OPERATING_CONDITIONS}
- Safety features: pressure relief valves, leak detection, ventilation systems

CAD-quality visualization with accurate proportions, proper material representation, and industrial standard compliance.

Materials: stainless steel 316L for hydrogen contact surfaces, carbon steel for structural elements, specialized seals and gaskets for hydrogen service.

Clean industrial background, technical lighting, engineering documentation quality.

{ADDITIONAL_SPECS}",
        default_materials: None,
        keywords: &[
            "hidrogen", "hydrogen", "elektrolisis", "electrolysis", "pem", "soec", "alkaline",
            "storage", "penyimpanan", "fuel cell", "h2", "green hydrogen", "blue hydrogen",
        ],
        defaults: &[
            ("EQUIPMENT_TYPE", ParamDefault::Literal("production/storage")),
            ("TECHNICAL_FUNCTION", ParamDefault::Literal("hydrogen generation and handling")),
            (
                "MAIN_COMPONENTS",
                ParamDefault::Literal("electrolyzer stack, power supply, gas separators, cooling system"),
            ),
            ("OPERATING_CONDITIONS", ParamDefault::Literal("ambient to 80°C, 1-30 bar pressure")),
            ("ADDITIONAL_SPECS", ParamDefault::Literal("")),
        ],
    },
    EngineeringTemplate {
        id: "process_flow_diagram",
        name: "Process Flow Diagram",
        description: "Diagram alir proses industri",
        template: "Professional Process Flow Diagram (PFD) for {PROCESS_NAME}.

Clear engineering diagram showing:
- Process units: {PROCESS_UNITS}
- Flow directions with arrows
- Major equipment symbols (ISO/ANSI standards)
- Stream labels and flow rates
- Operating parameters

Style: Technical P&ID/PFD standard, clean lines, proper symbols, readable labels.
Color coding: Process streams in blue, utilities in green, products in yellow.
Background: White/light gray engineering paper style.

{ADDITIONAL_SPECS}",
        default_materials: None,
        keywords: &[
            "diagram alir", "flow diagram", "pfd", "p&id", "proses", "process flow",
            "alur", "flowchart teknik", "diagram proses",
        ],
        defaults: &[
            ("PROCESS_NAME", ParamDefault::SameAs("OBJECT_NAME")),
            (
                "PROCESS_UNITS",
                ParamDefault::Literal("reactors, separators, heat exchangers, pumps, compressors"),
            ),
            ("ADDITIONAL_SPECS", ParamDefault::Literal("")),
        ],
    },
    EngineeringTemplate {
        id: "technical_illustration",
        name: "Technical Illustration",
        description: "Ilustrasi teknis untuk dokumentasi",
        template: "Professional technical illustration of {OBJECT_NAME} for engineering documentation.

Detailed cutaway/exploded view showing:
- Internal components and assembly
- Part numbering and callouts
- Dimensional annotations
- Material specifications

Style: Technical manual quality, isometric or orthographic projection.
Clean lines, precise geometry, professional appearance.
Suitable for manufacturing documentation and training materials.

{ADDITIONAL_SPECS}",
        default_materials: None,
        keywords: &[
            "ilustrasi teknis", "technical drawing", "gambar teknik", "cutaway",
            "exploded view", "assembly drawing", "detail drawing",
        ],
        defaults: &[("ADDITIONAL_SPECS", ParamDefault::Literal(""))],
    },
];

static OBJECT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)gambar(?:kan)?\s+(.+?)(?:\s+untuk|\s+dengan|\s+yang|\.|$)",
        r"(?i)buatkan?\s+(?:gambar\s+)?(.+?)(?:\s+untuk|\s+dengan|\.|$)",
        r"(?i)visualisasi\s+(.+?)(?:\s+untuk|\s+dengan|\.|$)",
        r"(?i)ilustrasi\s+(.+?)(?:\s+untuk|\s+dengan|\.|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid object pattern"))
    .collect()
});

static FUNCTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)untuk\s+(.+?)(?:\s+dengan|\.|$)",
        r"(?i)fungsi\s+(.+?)(?:\s+dengan|\.|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid function pattern"))
    .collect()
});

static LEFTOVER_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[A-Z_]+\}").expect("valid placeholder pattern"));

/// First template whose keyword occurs in the utterance
pub fn detect_template(utterance: &str) -> Option<&'static EngineeringTemplate> {
    let lower = utterance.to_lowercase();
    TEMPLATES
        .iter()
        .find(|t| t.keywords.iter().any(|k| lower.contains(k)))
}

pub fn find_template(id: &str) -> Option<&'static EngineeringTemplate> {
    TEMPLATES.iter().find(|t| t.id == id)
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    })
}

impl EngineeringTemplate {
    /// Resolve every placeholder value this template uses
    pub fn extract_parameters(&self, utterance: &str) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();

        let object = first_capture(&OBJECT_PATTERNS, utterance).unwrap_or_else(|| {
            utterance
                .replace("buatkan gambar", "")
                .replace("buat gambar", "")
                .trim()
                .to_string()
        });
        params.insert("OBJECT_NAME", object);

        if let Some(function) = first_capture(&FUNCTION_PATTERNS, utterance) {
            params.insert("TECHNICAL_FUNCTION", function);
        }

        for (key, default) in self.defaults {
            if params.contains_key(key) {
                continue;
            }
            let value = match default {
                ParamDefault::Literal(v) => v.to_string(),
                ParamDefault::SameAs(other) => params.get(other).cloned().unwrap_or_default(),
            };
            params.insert(*key, value);
        }

        params
    }

    /// Fill placeholders; unresolved ones are deleted
    pub fn instantiate(&self, params: &BTreeMap<&'static str, String>) -> String {
        let mut prompt = self.template.to_string();
        for (key, value) in params {
            prompt = prompt.replace(&format!("{{{}}}", key), value);
        }
        LEFTOVER_PLACEHOLDER
            .replace_all(&prompt, "")
            .trim()
            .to_string()
    }

    pub fn render(&self, utterance: &str) -> String {
        self.instantiate(&self.extract_parameters(utterance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_order() {
        let ids: Vec<&str> = TEMPLATES.iter().map(|t| t.id).collect();
        assert_eq!(
            ids,
            vec![
                "engineering_cad",
                "hydrogen_equipment",
                "process_flow_diagram",
                "technical_illustration"
            ]
        );
    }

    #[test]
    fn test_detect_first_match_wins() {
        // "fuel cell" is in both CAD and hydrogen; CAD is declared first
        assert_eq!(detect_template("gambarkan fuel cell").unwrap().id, "engineering_cad");
        assert_eq!(detect_template("Visualisasi REACTOR").unwrap().id, "engineering_cad");
        assert_eq!(
            detect_template("buat gambar produksi hydrogen").unwrap().id,
            "hydrogen_equipment"
        );
        assert!(detect_template("gambarkan kucing lucu").is_none());
    }

    #[test]
    fn test_extract_object_and_function() {
        let t = find_template("engineering_cad").unwrap();
        let params = t.extract_parameters("Buatkan gambar reactor hidrogen untuk produksi amonia");
        assert_eq!(params["OBJECT_NAME"], "reactor hidrogen");
        assert_eq!(params["TECHNICAL_FUNCTION"], "produksi amonia");
        assert_eq!(params["MATERIALS"], CAD_MATERIALS);
    }

    #[test]
    fn test_extract_defaults() {
        let t = find_template("engineering_cad").unwrap();
        let params = t.extract_parameters("gambarkan pompa sentrifugal");
        assert_eq!(params["OBJECT_NAME"], "pompa sentrifugal");
        assert_eq!(
            params["TECHNICAL_FUNCTION"],
            "industrial application and manufacturing"
        );
        assert_eq!(params["ADDITIONAL_SPECS"], "");
    }

    #[test]
    fn test_process_name_follows_object() {
        let t = find_template("process_flow_diagram").unwrap();
        let params = t.extract_parameters("visualisasi proses haber-bosch");
        assert_eq!(params["PROCESS_NAME"], "proses haber-bosch");
        let prompt = t.instantiate(&params);
        assert!(prompt.starts_with("Professional Process Flow Diagram (PFD) for proses haber-bosch."));
    }

    #[test]
    fn test_object_falls_back_to_whole_utterance() {
        let t = find_template("technical_illustration").unwrap();
        let params = t.extract_parameters("  exploded view turbin angin ");
        assert_eq!(params["OBJECT_NAME"], "exploded view turbin angin");
    }

    #[test]
    fn test_instantiate_leaves_no_placeholder() {
        for t in TEMPLATES {
            for utterance in ["", "gambarkan x untuk y dengan z", "buat gambar tangki"] {
                let out = t.render(utterance);
                assert!(!LEFTOVER_PLACEHOLDER.is_match(&out), "{} left a placeholder", t.id);
            }
            // Even with nothing resolved
            let bare = t.instantiate(&BTreeMap::new());
            assert!(!LEFTOVER_PLACEHOLDER.is_match(&bare));
        }
    }

    #[test]
    fn test_hydrogen_defaults_rendered() {
        let t = find_template("hydrogen_equipment").unwrap();
        let out = t.render("gambarkan elektroliser PEM");
        assert!(out.contains("ambient to 80°C, 1-30 bar pressure"));
        assert!(out.contains("a hydrogen production/storage system"));
    }

    #[test]
    fn test_serialize_for_listing() {
        let json = serde_json::to_value(find_template("engineering_cad").unwrap()).unwrap();
        assert_eq!(json["id"], "engineering_cad");
        assert_eq!(json["default_materials"], CAD_MATERIALS);
        assert!(json.get("defaults").is_none());
        let json = serde_json::to_value(find_template("technical_illustration").unwrap()).unwrap();
        assert!(json.get("default_materials").is_none());
    }
}
