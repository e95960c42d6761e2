use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Name of the skeleton covering every joint the model predicts.
pub const FULL_SKELETON: &str = "all";

/// One skeleton standard: which of the model's joints it uses and how they connect.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub joints: Vec<String>,
    /// Pairs of indices into `joints`
    pub edges: Vec<[usize; 2]>,
    /// Position of each joint within the model's full joint set
    pub indices: Vec<usize>,
}

impl Skeleton {
    /// Picks this skeleton's joints out of a full-set pose.
    pub fn select<T: Copy>(&self, full_pose: &[T]) -> Result<Vec<T>> {
        self.indices
            .iter()
            .map(|&i| {
                full_pose
                    .get(i)
                    .copied()
                    .with_context(|| format!("joint index {} out of range for pose of {} joints", i, full_pose.len()))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct SkeletonsFile {
    joints: Vec<String>,
    edges: Vec<[usize; 2]>,
    #[serde(default)]
    skeletons: BTreeMap<String, SubsetEntry>,
}

#[derive(Debug, Deserialize)]
struct SubsetEntry {
    indices: Vec<usize>,
    edges: Vec<[usize; 2]>,
}

/// Skeleton standards shipped with a model (`skeletons.json`).
///
/// ```json
/// {
///   "joints": ["pelv", "lhip", ...],
///   "edges": [[1, 0], ...],
///   "skeletons": { "smpl_24": { "indices": [0, 1, ...], "edges": [[1, 4], ...] } }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SkeletonCatalog {
    skeletons: BTreeMap<String, Skeleton>,
}

impl SkeletonCatalog {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read skeleton definitions {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid skeleton definitions {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: SkeletonsFile = serde_json::from_str(content)?;
        let total = file.joints.len();

        let full = Skeleton {
            joints: file.joints.clone(),
            edges: file.edges,
            indices: (0..total).collect(),
        };
        validate(FULL_SKELETON, &full, total)?;

        let mut skeletons = BTreeMap::new();
        for (name, entry) in file.skeletons {
            let joints = entry
                .indices
                .iter()
                .map(|&i| file.joints.get(i).cloned())
                .collect::<Option<Vec<_>>>()
                .with_context(|| format!("skeleton {} references a joint outside 0..{}", name, total))?;
            let skeleton = Skeleton { joints, edges: entry.edges, indices: entry.indices };
            validate(&name, &skeleton, total)?;
            skeletons.insert(normalize_name(&name), skeleton);
        }
        skeletons.insert(FULL_SKELETON.to_string(), full);

        Ok(Self { skeletons })
    }

    /// Looks up a skeleton. Empty selects the full set; `+` and `_` are interchangeable.
    pub fn get(&self, name: &str) -> Result<&Skeleton> {
        let key = normalize_name(name);
        match self.skeletons.get(&key) {
            Some(s) => Ok(s),
            None => bail!("Unknown skeleton {:?}, available: {}", name, self.names().collect::<Vec<_>>().join(", ")),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.skeletons.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Skeleton)> {
        self.skeletons.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn full_joint_count(&self) -> usize {
        self.skeletons[FULL_SKELETON].joints.len()
    }
}

fn normalize_name(name: &str) -> String {
    if name.is_empty() {
        FULL_SKELETON.to_string()
    } else {
        name.replace('+', "_")
    }
}

fn validate(name: &str, skeleton: &Skeleton, total: usize) -> Result<()> {
    if skeleton.joints.len() != skeleton.indices.len() {
        bail!("skeleton {}: {} joint names for {} indices", name, skeleton.joints.len(), skeleton.indices.len());
    }
    if let Some(&i) = skeleton.indices.iter().find(|&&i| i >= total) {
        bail!("skeleton {}: joint index {} outside 0..{}", name, i, total);
    }
    let count = skeleton.joints.len();
    if let Some(edge) = skeleton.edges.iter().find(|e| e[0] >= count || e[1] >= count) {
        bail!("skeleton {}: edge {:?} outside 0..{}", name, edge, count);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFINITIONS: &str = r#"{
        "joints": ["pelv", "lhip", "rhip", "neck", "head"],
        "edges": [[0, 1], [0, 2], [0, 3], [3, 4]],
        "skeletons": {
            "smpl+head_3": { "indices": [0, 3, 4], "edges": [[0, 1], [1, 2]] }
        }
    }"#;

    #[test]
    fn test_full_skeleton_is_default() {
        let catalog = SkeletonCatalog::from_json(DEFINITIONS).unwrap();
        let full = catalog.get("").unwrap();
        assert_eq!(full.joints.len(), 5);
        assert_eq!(full.indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(catalog.get("all").unwrap(), full);
        assert_eq!(catalog.full_joint_count(), 5);
    }

    #[test]
    fn test_plus_and_underscore_are_equivalent() {
        let catalog = SkeletonCatalog::from_json(DEFINITIONS).unwrap();
        let a = catalog.get("smpl+head_3").unwrap();
        let b = catalog.get("smpl_head_3").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.joints, vec!["pelv", "neck", "head"]);
    }

    #[test]
    fn test_unknown_skeleton_lists_names() {
        let catalog = SkeletonCatalog::from_json(DEFINITIONS).unwrap();
        let err = catalog.get("coco_19").unwrap_err().to_string();
        assert!(err.contains("coco_19"));
        assert!(err.contains("all"));
        assert!(err.contains("smpl_head_3"));
    }

    #[test]
    fn test_select_joints() {
        let catalog = SkeletonCatalog::from_json(DEFINITIONS).unwrap();
        let skeleton = catalog.get("smpl_head_3").unwrap();
        let pose = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        assert_eq!(skeleton.select(&pose).unwrap(), vec![[0.0, 0.0], [3.0, 3.0], [4.0, 4.0]]);
        assert!(skeleton.select(&pose[..2]).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_edges() {
        let bad = r#"{ "joints": ["a", "b"], "edges": [[0, 2]] }"#;
        assert!(SkeletonCatalog::from_json(bad).is_err());

        let bad_subset = r#"{
            "joints": ["a", "b"], "edges": [],
            "skeletons": { "x": { "indices": [0, 5], "edges": [] } }
        }"#;
        assert!(SkeletonCatalog::from_json(bad_subset).is_err());
    }
}
