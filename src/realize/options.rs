//! Realization options

use serde::{Deserialize, Serialize};

use crate::attribute::AttributeFilter;
use crate::util::{Error, Result};

/// Options controlling how instances are realized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealizeOptions {
    /// Copy stored ids verbatim instead of combining them with the instance path
    pub keep_original_ids: bool,
    /// Propagate instance attributes onto the realized points
    pub realize_instance_attributes: bool,
    /// Which generic attributes reach the output
    pub attribute_filter: AttributeFilter,
}

impl Default for RealizeOptions {
    fn default() -> Self {
        Self {
            keep_original_ids: false,
            realize_instance_attributes: true,
            attribute_filter: AttributeFilter::All,
        }
    }
}

impl RealizeOptions {
    /// Parse options from JSON. Missing fields take their default.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize options to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Which top-level instances to realize, and how deep.
///
/// Depth counts instance levels starting at the top-level instance itself:
/// 1 realizes what the instance references but keeps its nested instances,
/// 2 also realizes one nested level, and so on. Depth 0 leaves the instance
/// untouched. Unselected instances are kept as instances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariedDepthOptions {
    /// Indices of the top-level instances to realize
    pub selection: Vec<usize>,
    /// Depth per top-level instance. `None` or a missing entry is unlimited
    pub depths: Vec<Option<u32>>,
}

impl VariedDepthOptions {
    /// Realize all of `num_instances` top-level instances completely.
    pub fn all(num_instances: usize) -> Self {
        Self {
            selection: (0..num_instances).collect(),
            depths: Vec::new(),
        }
    }

    /// Realize all of `num_instances` top-level instances down to `depth`.
    pub fn with_depth(num_instances: usize, depth: u32) -> Self {
        Self {
            selection: (0..num_instances).collect(),
            depths: vec![Some(depth); num_instances],
        }
    }

    /// Depth of top-level instance `index`.
    #[inline]
    pub fn depth_of(&self, index: usize) -> Option<u32> {
        self.depths.get(index).copied().flatten()
    }

    /// Selected indices in ascending order with the instance levels left
    /// below each one, dropping duplicates and depth-0 entries.
    pub(crate) fn resolve(&self, num_instances: usize) -> Result<Vec<(usize, Option<u32>)>> {
        if let Some(&index) = self.selection.iter().find(|&&i| i >= num_instances) {
            return Err(Error::InvalidSelection {
                index,
                count: num_instances,
            });
        }
        let mut selection = self.selection.clone();
        selection.sort_unstable();
        selection.dedup();
        Ok(selection
            .into_iter()
            .filter_map(|i| match self.depth_of(i) {
                Some(0) => None,
                depth => Some((i, depth.map(|d| d - 1))),
            })
            .collect())
    }
}
