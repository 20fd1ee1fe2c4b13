//! Catalog of the STL and STEP parts shipped with the housing.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use log::debug;
use log::info;
use serde::Serialize;

use crate::MeshError;
use crate::MeshResult;
use crate::io::save_json;

/// File extensions picked up by a scan, compared case-insensitively.
pub const MODEL_EXTENSIONS: [&str; 2] = ["stl", "step"];

/// Role of a part, decided from its path and file name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum ModelCategory {
    HousingFront,
    HousingBack,
    HousingGrip,
    HousingTrigger,
    HousingMisc,
    ButtonAction,
    ButtonTrigger,
    ButtonShoulder,
    ButtonDpad,
    ButtonVolume,
    ButtonMisc,
    Unknown,
}

impl ModelCategory {
    /// Snake case identifier, also used for OpenSCAD module names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HousingFront => "housing_front",
            Self::HousingBack => "housing_back",
            Self::HousingGrip => "housing_grip",
            Self::HousingTrigger => "housing_trigger",
            Self::HousingMisc => "housing_misc",
            Self::ButtonAction => "button_action",
            Self::ButtonTrigger => "button_trigger",
            Self::ButtonShoulder => "button_shoulder",
            Self::ButtonDpad => "button_dpad",
            Self::ButtonVolume => "button_volume",
            Self::ButtonMisc => "button_misc",
            Self::Unknown => "unknown",
        }
    }

    /// Classify a model file.
    ///
    /// The directory decides housing or button; the file stem picks the role.
    #[must_use]
    pub fn of(path: &Path) -> Self {
        let full = path.to_string_lossy().to_lowercase();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let has = |word: &str| name.contains(word);
        if full.contains("housing") {
            if has("front") {
                Self::HousingFront
            } else if has("back") || has("cover") {
                Self::HousingBack
            } else if has("grip") {
                Self::HousingGrip
            } else if has("trigger") {
                Self::HousingTrigger
            } else {
                Self::HousingMisc
            }
        } else if full.contains("button") {
            if has("action") {
                Self::ButtonAction
            } else if has("trigger") {
                Self::ButtonTrigger
            } else if has("shoulder") {
                Self::ButtonShoulder
            } else if has("dpad") || has("d-pad") {
                Self::ButtonDpad
            } else if has("volume") {
                Self::ButtonVolume
            } else {
                Self::ButtonMisc
            }
        } else {
            Self::Unknown
        }
    }

    /// Stock description, `None` for the catch-all categories.
    #[must_use]
    pub const fn description(self) -> Option<&'static str> {
        match self {
            Self::HousingFront => Some("Front housing panel with screen cutout and button holes"),
            Self::HousingBack => Some("Back cover with ventilation and port access"),
            Self::HousingGrip => Some("Side grip for ergonomic handling"),
            Self::HousingTrigger => Some("Trigger mount assembly"),
            Self::ButtonAction => Some("Action button (A/B/X/Y)"),
            Self::ButtonTrigger => Some("Trigger button assembly"),
            Self::ButtonShoulder => Some("Shoulder button"),
            Self::ButtonDpad => Some("Directional pad"),
            Self::ButtonVolume => Some("Volume control button"),
            Self::HousingMisc | Self::ButtonMisc | Self::Unknown => None,
        }
    }

    /// "Housing Front" style heading.
    #[must_use]
    pub fn title(self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars).collect()
                })
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ModelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for one model file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    /// File stem.
    pub name: String,
    /// Location on disk.
    pub path: PathBuf,
    /// Lower case extension with its dot, e.g. `.stl`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Size in bytes.
    pub size: u64,
    /// Role.
    pub category: ModelCategory,
    /// One line description.
    pub description: String,
}

impl ModelInfo {
    /// Inspect a model file.
    ///
    /// # Errors
    ///   When the file metadata cannot be read.
    pub fn new(path: &Path) -> MeshResult<Self> {
        let size = std::fs::metadata(path)
            .map_err(|source| MeshError::IoRead {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let kind = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        let category = ModelCategory::of(path);
        let description = category.description().map_or_else(
            || format!("3D model component: {name}"),
            str::to_string,
        );
        Ok(Self {
            name,
            path: path.to_path_buf(),
            kind,
            size,
            category,
            description,
        })
    }
}

fn is_model(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        MODEL_EXTENSIONS
            .iter()
            .any(|m| ext.eq_ignore_ascii_case(m))
    })
}

fn collect(dir: &Path, out: &mut Vec<PathBuf>) -> MeshResult<()> {
    let entries = std::fs::read_dir(dir).map_err(|source| MeshError::IoRead {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let path = entry
            .map_err(|source| MeshError::IoRead {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        if path.is_dir() {
            collect(&path, out)?;
        } else if is_model(&path) {
            out.push(path);
        }
    }
    Ok(())
}

/// Every model file found below a root directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelLibrary {
    models: Vec<ModelInfo>,
}

impl ModelLibrary {
    /// Walk `root` recursively.
    ///
    /// # Errors
    ///   When a directory or file cannot be read.
    pub fn scan(root: &Path) -> MeshResult<Self> {
        let mut paths = Vec::new();
        collect(root, &mut paths)?;
        paths.sort();
        let models = paths
            .iter()
            .map(|p| ModelInfo::new(p))
            .collect::<MeshResult<Vec<_>>>()?;
        info!("found {} models under {}", models.len(), root.display());
        for m in &models {
            debug!("{} -> {}", m.path.display(), m.category);
        }
        Ok(Self { models })
    }

    /// All models in path order.
    #[must_use]
    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    /// Models of one category.
    pub fn by_category(&self, category: ModelCategory) -> impl Iterator<Item = &ModelInfo> {
        self.models.iter().filter(move |m| m.category == category)
    }

    /// Models grouped by category.
    #[must_use]
    pub fn catalog(&self) -> BTreeMap<ModelCategory, Vec<&ModelInfo>> {
        let mut catalog: BTreeMap<_, Vec<_>> = BTreeMap::new();
        for m in &self.models {
            catalog.entry(m.category).or_default().push(m);
        }
        catalog
    }

    /// Write the grouped catalog as JSON.
    ///
    /// # Errors
    ///   When the file cannot be written.
    pub fn export_catalog(&self, path: &Path) -> MeshResult<()> {
        save_json(path, &self.catalog())
    }

    /// OpenSCAD source wrapping each model in a numbered module.
    #[must_use]
    pub fn openscad_imports(&self) -> String {
        let mut out = String::from("// Auto-generated model imports\n\n");
        for (category, models) in self.catalog() {
            out.push_str(&format!("// {}\n", category.title()));
            for (i, m) in models.iter().enumerate() {
                out.push_str(&format!(
                    "module {category}_{i}() {{\n    import(\"{}\");\n}}\n",
                    m.path.display()
                ));
            }
            out.push('\n');
        }
        out
    }
}
