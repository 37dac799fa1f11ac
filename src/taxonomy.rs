// src/taxonomy.rs
//
// Geofence taxonomy: partitions the distinct geofence labels of a dataset
// into operational roles. Site geofence names vary, so the roles are derived
// per dataset from normalized substring rules, never hard-coded. The taxonomy
// is built once per run and passed by reference to every downstream stage.

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GeofenceRole {
    Stock,
    Module,
    /// Run-of-mine processing piles. Routed like modules but tracked
    /// separately because some sites report them independently.
    ProcessingPile,
    Dump,
    NonOperational,
    Unclassified,
}

impl GeofenceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stock => "STOCK",
            Self::Module => "MODULE",
            Self::ProcessingPile => "PROCESSING_PILE",
            Self::Dump => "DUMP",
            Self::NonOperational => "NON_OPERATIONAL",
            Self::Unclassified => "UNCLASSIFIED",
        }
    }
}

/// Lowercases and strips diacritics so substring rules survive the
/// accent variations seen in site exports ("Módulo" vs "Modulo").
pub fn normalize(label: &str) -> String {
    label
        .chars()
        .flat_map(|c| c.to_lowercase())
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GeofenceTaxonomy {
    pub stocks: BTreeSet<String>,
    pub modules: BTreeSet<String>,
    pub processing_piles: BTreeSet<String>,
    pub dumps: BTreeSet<String>,
    pub non_operational: BTreeSet<String>,
    pub unclassified: BTreeSet<String>,
}

impl GeofenceTaxonomy {
    /// Builds the taxonomy from the distinct non-empty labels of a dataset.
    ///
    /// Rule order matters: the first matching rule claims the label, so every
    /// label lands in exactly one role. An empty dump set is valid; downstream
    /// classification degrades to "no dump moves" instead of failing.
    pub fn from_labels<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut taxonomy = Self::default();

        for label in labels {
            let label = label.trim();
            if label.is_empty() {
                continue;
            }
            let norm = normalize(label);
            let owned = label.to_string();

            if norm.contains("stock") {
                taxonomy.stocks.insert(owned);
            } else if norm.contains("modulo") {
                taxonomy.modules.insert(owned);
            } else if norm.contains("pila") && norm.contains("rom") {
                taxonomy.processing_piles.insert(owned);
            } else if norm.contains("botadero") {
                taxonomy.dumps.insert(owned);
            } else if norm.contains("instalacion")
                || norm.contains("faena")
                || norm.contains("casino")
            {
                taxonomy.non_operational.insert(owned);
            } else {
                taxonomy.unclassified.insert(owned);
            }
        }

        info!(
            "Taxonomy: {} stocks, {} modules, {} piles, {} dumps, {} non-operational, {} unclassified",
            taxonomy.stocks.len(),
            taxonomy.modules.len(),
            taxonomy.processing_piles.len(),
            taxonomy.dumps.len(),
            taxonomy.non_operational.len(),
            taxonomy.unclassified.len(),
        );
        if taxonomy.dumps.is_empty() {
            warn!("No dump geofence detected; dump moves will classify as OTHER");
        }

        taxonomy
    }

    pub fn role(&self, label: &str) -> GeofenceRole {
        if self.stocks.contains(label) {
            GeofenceRole::Stock
        } else if self.modules.contains(label) {
            GeofenceRole::Module
        } else if self.processing_piles.contains(label) {
            GeofenceRole::ProcessingPile
        } else if self.dumps.contains(label) {
            GeofenceRole::Dump
        } else if self.non_operational.contains(label) {
            GeofenceRole::NonOperational
        } else {
            GeofenceRole::Unclassified
        }
    }

    pub fn is_stock(&self, label: &str) -> bool {
        self.stocks.contains(label)
    }

    /// Modules and processing piles route identically for load/return moves.
    pub fn is_module_like(&self, label: &str) -> bool {
        self.modules.contains(label) || self.processing_piles.contains(label)
    }

    pub fn is_dump(&self, label: &str) -> bool {
        self.dumps.contains(label)
    }

    pub fn is_non_operational(&self, label: &str) -> bool {
        self.non_operational.contains(label)
    }

    /// True when no label matched any operational role; the caller should
    /// surface this as a data-quality warning.
    pub fn is_operationally_empty(&self) -> bool {
        self.stocks.is_empty()
            && self.modules.is_empty()
            && self.processing_piles.is_empty()
            && self.dumps.is_empty()
    }
}
