//! Image and label volume collaborators.
//!
//! Reading TIFF/KLB files, projecting, and masking volumes live outside this
//! crate. The forest only holds a pair of [`VolumeLoader`]s and treats a
//! missing loader or a loader returning nothing as "no data".

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::forest::Forest;
use crate::model::{Label, Ordinal};

/// A dense 3-D volume of voxel values (intensities or mask labels).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    shape: [usize; 3],
    voxels: Vec<u32>,
}

impl Volume {
    /// Wraps `voxels` laid out in row-major order for `shape`.
    ///
    /// Returns `None` if the voxel count does not match the shape.
    pub fn new(shape: [usize; 3], voxels: Vec<u32>) -> Option<Self> {
        (shape.iter().product::<usize>() == voxels.len()).then_some(Self { shape, voxels })
    }

    /// Volume extent along each axis.
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Raw voxel values.
    pub fn voxels(&self) -> &[u32] {
        &self.voxels
    }

    /// Distinct non-zero voxel values, i.e. the labels present in a mask.
    pub fn distinct_labels(&self) -> BTreeSet<Label> {
        self.voxels.iter().copied().filter(|v| *v != 0).collect()
    }
}

/// Loads the volume for one timestamp, or `None` when no data exists.
pub trait VolumeLoader {
    /// Volume for `ordinal`.
    fn load(&self, ordinal: Ordinal) -> Option<Volume>;
}

impl<F> VolumeLoader for F
where
    F: Fn(Ordinal) -> Option<Volume>,
{
    fn load(&self, ordinal: Ordinal) -> Option<Volume> {
        self(ordinal)
    }
}

/// A loader that never has data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLoader;

impl VolumeLoader for NullLoader {
    fn load(&self, _ordinal: Ordinal) -> Option<Volume> {
        None
    }
}

/// The image/label loader pair held by a forest.
#[derive(Clone, Default)]
pub struct VolumeSources {
    image: Option<Arc<dyn VolumeLoader + Send + Sync>>,
    labels: Option<Arc<dyn VolumeLoader + Send + Sync>>,
}

impl fmt::Debug for VolumeSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VolumeSources")
            .field("image", &self.image.is_some())
            .field("labels", &self.labels.is_some())
            .finish()
    }
}

/// Outcome of asking a forest for a volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The loader produced a volume.
    Loaded(Volume),
    /// No loader is configured.
    NoLoader,
    /// The loader has no data for this timestamp.
    Missing,
}

impl LoadOutcome {
    /// The volume, if one was loaded.
    pub fn into_volume(self) -> Option<Volume> {
        match self {
            LoadOutcome::Loaded(volume) => Some(volume),
            LoadOutcome::NoLoader | LoadOutcome::Missing => None,
        }
    }
}

/// Result of comparing one timestamp's labels with its label volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelCheck {
    /// No label volume could be loaded.
    NoVolume,
    /// A volume exists; labels were not compared.
    Present,
    /// Timestamp labels and volume labels agree.
    Matched,
    /// The label sets differ.
    Mismatch {
        /// Labels in the volume without a node.
        missing_in_lineage: Vec<Label>,
        /// Node labels absent from the volume.
        missing_in_volume: Vec<Label>,
    },
}

fn load_with(
    loader: Option<&Arc<dyn VolumeLoader + Send + Sync>>,
    ordinal: Ordinal,
) -> LoadOutcome {
    match loader {
        None => LoadOutcome::NoLoader,
        Some(loader) => loader
            .load(ordinal)
            .map_or(LoadOutcome::Missing, LoadOutcome::Loaded),
    }
}

impl Forest {
    /// Installs the image and label loaders.
    pub fn set_loaders(
        &mut self,
        image: impl VolumeLoader + Send + Sync + 'static,
        labels: impl VolumeLoader + Send + Sync + 'static,
    ) {
        self.volumes = VolumeSources {
            image: Some(Arc::new(image)),
            labels: Some(Arc::new(labels)),
        };
    }

    /// Installs loaders that never have data.
    pub fn use_null_loaders(&mut self) {
        self.set_loaders(NullLoader, NullLoader);
    }

    /// Shares this forest's loaders with `other`.
    pub fn use_same_loaders(&self, other: &mut Forest) {
        other.volumes = self.volumes.clone();
    }

    /// Image volume for `ordinal`.
    pub fn load_image_for_timestamp(&self, ordinal: Ordinal) -> LoadOutcome {
        load_with(self.volumes.image.as_ref(), ordinal)
    }

    /// Label volume for `ordinal`.
    pub fn load_labels_for_timestamp(&self, ordinal: Ordinal) -> LoadOutcome {
        load_with(self.volumes.labels.as_ref(), ordinal)
    }

    /// Checks every timestamp for a label volume and, unless `trivial`,
    /// compares the volume's labels with the timestamp's node labels.
    pub fn check_labels(&self, trivial: bool) -> Vec<(Ordinal, LabelCheck)> {
        self.timestamps()
            .map(|ts| {
                let ordinal = ts.ordinal();
                let Some(volume) = self.load_labels_for_timestamp(ordinal).into_volume() else {
                    warn!(ordinal, "volume.labels.missing");
                    return (ordinal, LabelCheck::NoVolume);
                };
                if trivial {
                    return (ordinal, LabelCheck::Present);
                }
                let ts_labels: BTreeSet<Label> = ts.labels().collect();
                let volume_labels = volume.distinct_labels();
                let missing_in_volume: Vec<Label> =
                    ts_labels.difference(&volume_labels).copied().collect();
                let missing_in_lineage: Vec<Label> =
                    volume_labels.difference(&ts_labels).copied().collect();
                if missing_in_volume.is_empty() && missing_in_lineage.is_empty() {
                    (ordinal, LabelCheck::Matched)
                } else {
                    warn!(
                        ordinal,
                        missing_in_lineage = missing_in_lineage.len(),
                        missing_in_volume = missing_in_volume.len(),
                        "volume.labels.mismatch"
                    );
                    (
                        ordinal,
                        LabelCheck::Mismatch {
                            missing_in_lineage,
                            missing_in_volume,
                        },
                    )
                }
            })
            .collect()
    }
}
