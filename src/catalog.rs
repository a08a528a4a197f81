//! Field Catalog
//!
//! The fixed table of canonical plan-document fields the checklist tracks,
//! each with the textual identifiers that count as evidence for it, where in
//! a plan document it usually lives, and a short definition.
//!
//! The catalog is advisory: lookups for unknown names return empty or
//! placeholder values instead of failing.

use crate::fuzzy_matcher::FuzzyMatcher;
use serde::Serialize;

/// Location reported for fields the catalog does not know.
pub const UNKNOWN_LOCATION: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDefinition {
    pub canonical_name: String,
    /// Ordered; validation tries identifiers in this order
    pub identifiers: Vec<String>,
    pub location_hint: String,
    pub definition_text: String,
}

impl FieldDefinition {
    fn new(name: &str, identifiers: &[&str], location: &str, definition: &str) -> Self {
        Self {
            canonical_name: name.to_string(),
            identifiers: identifiers.iter().map(|s| s.to_string()).collect(),
            location_hint: location.to_string(),
            definition_text: definition.to_string(),
        }
    }
}

/// Short labels used by the upstream extraction tables.
const LABEL_ALIASES: &[(&str, &str)] = &[
    ("Group Eff Date", "Group Effective Date"),
    ("Effective Date", "Group Effective Date"),
    ("Min Hour Requirement", "Min. Hour Requirement"),
    ("BOD Directors Officers", "BOD, Directors, Officers"),
    ("COB", "Coordination of Benefits"),
    ("Workers Compensation", "Workers Comp"),
    ("Reasonable and Customary", "R&C"),
    ("Experimental and Investigational", "E&I"),
];

#[derive(Debug, Clone)]
pub struct FieldCatalog {
    fields: Vec<FieldDefinition>,
}

impl FieldCatalog {
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        Self { fields }
    }

    /// The shipped 25-field catalog.
    pub fn standard() -> Self {
        let fields = vec![
            FieldDefinition::new(
                "Group Name",
                &["Policyholder", "Employer", "Group"],
                "PA system only",
                "Policyholder, Employer, Group",
            ),
            FieldDefinition::new(
                "Group Effective Date",
                &["Effective", "Retated", "Revised effective dates"],
                "PA system only",
                "Effective date of the contract",
            ),
            FieldDefinition::new(
                "TPA",
                &[
                    "Claims Administrator",
                    "Third Party Administrator",
                    "TPA",
                    "Claims Provider",
                    "Plan Administrator",
                    "Plan Supervisor",
                ],
                "Plan Document",
                "A TPA performs administrative services for the Plan including payment of claims",
            ),
            FieldDefinition::new(
                "UR Vendor",
                &[
                    "Utilization Review",
                    "Utilization Management",
                    "Utilization Review Organization",
                    "Pre-Certification",
                    "Pre-Authorization",
                    "MedAxis",
                    "MedBridge",
                    "Apex Medical Review",
                ],
                "Plan Document",
                "The process of certifying medical necessity for hospitalization and procedures",
            ),
            FieldDefinition::new(
                "PPO Network",
                &[
                    "PPO Network",
                    "Preferred Provider Network",
                    "Provider Network",
                    "Preferred Provider Organization",
                    "HealthSphere",
                    "StellarCare",
                    "UnityHealth",
                ],
                "Plan Document",
                "An organization that has contracted with various providers",
            ),
            FieldDefinition::new(
                "Min. Hour Requirement",
                &["30 hours", "28 hours", "32 hours", "hours per week", "full-time"],
                "Eligibility Section",
                "Employee is required to work specified hours per week",
            ),
            FieldDefinition::new(
                "Retirees",
                &["Retiree", "retirees", "retired employees"],
                "Eligibility Section",
                "Coverage for retired employees",
            ),
            FieldDefinition::new(
                "BOD, Directors, Officers",
                &["Board of Directors", "Directors", "Officers", "owners", "partners"],
                "Eligibility Section",
                "Board members, directors, or officers eligibility",
            ),
            FieldDefinition::new(
                "Dependent Definitions",
                &["Dependent", "legal spouse", "child", "domestic partner"],
                "Eligibility Section",
                "Defined eligible dependent of an eligible employee",
            ),
            FieldDefinition::new(
                "Req Adding Dependents",
                &[
                    "special enrollment",
                    "31 days",
                    "30 days",
                    "marriage",
                    "birth",
                    "adoption",
                    "proof of relationship",
                ],
                "Special Enrollment Section",
                "Requirements for adding dependents",
            ),
            FieldDefinition::new(
                "Dependent to Age 26",
                &["26th birthday", "age 26", "until 26"],
                "Eligibility Section",
                "Dependent child coverage until age 26",
            ),
            FieldDefinition::new(
                "Grandchildren",
                &["grandchildren", "children of dependent children", "legal guardian"],
                "Eligibility Section",
                "Children of dependent children",
            ),
            FieldDefinition::new(
                "Termination Provisions",
                &["Termination", "coverage ends", "last day of employment"],
                "Termination Section",
                "Circumstances in which coverage ends",
            ),
            FieldDefinition::new(
                "Open Enrollment",
                &["Open Enrollment", "annual enrollment", "once a year"],
                "Eligibility Section",
                "Annual period for enrollment",
            ),
            FieldDefinition::new(
                "Leave of Absence",
                &["Leave of Absence", "LOA", "Leave", "FMLA", "3 months", "12 weeks"],
                "Termination Section or FMLA Section",
                "Coverage continuation during leave",
            ),
            FieldDefinition::new(
                "Medically Necessary",
                &[
                    "Medically Necessary",
                    "medical necessity",
                    "preventing",
                    "diagnosing",
                    "treating",
                ],
                "Definitions Section",
                "Health care services required for diagnosis or treatment",
            ),
            FieldDefinition::new(
                "E&I",
                &["Experimental", "Investigational", "Unproven"],
                "Exclusions Section or Definitions",
                "Experimental and Investigational treatments",
            ),
            FieldDefinition::new(
                "R&C",
                &[
                    "Reasonable & Customary",
                    "Reasonable and Customary",
                    "typical charge",
                    "geographic area",
                ],
                "Definitions Section",
                "Typical charge for a service in a geographic area",
            ),
            FieldDefinition::new(
                "Workers Comp",
                &["Workers' Compensation", "Workers Compensation", "Occupational"],
                "Exclusions Section",
                "Workers compensation exclusion",
            ),
            FieldDefinition::new(
                "Transplant",
                &["Transplant", "organ", "tissue transplant", "donor"],
                "Transplant Benefits Section",
                "Transplant services coverage",
            ),
            FieldDefinition::new(
                "ETS Gene Therapy",
                &["ETS", "Emerging Therapy Solutions", "Gene Therapy"],
                "Plan Document",
                "ETS Centers of Excellence for gene therapy",
            ),
            FieldDefinition::new(
                "Coordination of Benefits",
                &["Coordination of Benefits", "COB", "more than one Plan"],
                "Coordination of Benefits Section",
                "Coordination when covered by multiple plans",
            ),
            FieldDefinition::new(
                "COBRA",
                &[
                    "COBRA",
                    "Consolidated Omnibus Budget Reconciliation Act",
                    "continuation",
                    "18 months",
                ],
                "COBRA Section",
                "COBRA continuation coverage",
            ),
            FieldDefinition::new(
                "Subrogation",
                &["Subrogation", "Right to Reimbursement", "Reimbursement", "third party"],
                "Subrogation Section",
                "Right to recover costs from third parties",
            ),
            FieldDefinition::new(
                "Infertility",
                &["Infertility", "$20,000", "$15,000", "$10,000"],
                "Schedule of Benefits",
                "Infertility treatment coverage and limits",
            ),
        ];

        Self::new(fields)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, canonical_name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.canonical_name == canonical_name)
    }

    pub fn contains(&self, canonical_name: &str) -> bool {
        self.get(canonical_name).is_some()
    }

    pub fn identifiers_for(&self, field: &str) -> &[String] {
        self.get(field).map(|f| f.identifiers.as_slice()).unwrap_or(&[])
    }

    pub fn location_for(&self, field: &str) -> &str {
        self.get(field)
            .map(|f| f.location_hint.as_str())
            .unwrap_or(UNKNOWN_LOCATION)
    }

    pub fn definition_for(&self, field: &str) -> &str {
        self.get(field).map(|f| f.definition_text.as_str()).unwrap_or("")
    }

    /// Map a raw upstream label to its canonical field name.
    ///
    /// Tries an exact name, the alias table, a punctuation/case-insensitive
    /// comparison, then the closest label by Jaro-Winkler.
    pub fn resolve(&self, label: &str) -> Option<&str> {
        let label = label.trim();
        if let Some(def) = self.get(label) {
            return Some(def.canonical_name.as_str());
        }

        if let Some((_, canonical)) = LABEL_ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(label))
        {
            if let Some(def) = self.get(canonical) {
                return Some(def.canonical_name.as_str());
            }
        }

        let matcher = FuzzyMatcher::default();
        let normalized = matcher.normalize_string(label);
        if normalized.is_empty() {
            return None;
        }
        if let Some(def) = self
            .fields
            .iter()
            .find(|f| matcher.normalize_string(&f.canonical_name) == normalized)
        {
            return Some(def.canonical_name.as_str());
        }

        matcher
            .find_best_match(label, self.fields.iter().map(|f| f.canonical_name.as_str()))
            .map(|(idx, _)| self.fields[idx].canonical_name.as_str())
    }
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
