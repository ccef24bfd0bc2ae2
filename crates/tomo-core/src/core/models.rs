use super::constants::{OUT_SUBTOMOS_STAR, OUT_TOMOS_STAR};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Working directory of a single protocol run.
///
/// Every protocol writes the files produced by the external programs into the
/// `extra` subdirectory of its run directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDirectory {
    root: PathBuf,
}

impl RunDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extra_dir(&self) -> PathBuf {
        self.root.join("extra")
    }

    pub fn extra_path(&self, name: &str) -> PathBuf {
        self.extra_dir().join(name)
    }
}

/// Reference to a finished data preparation protocol, the upstream step of the
/// de novo initial model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPreparation {
    pub run_dir: RunDirectory,
}

impl DataPreparation {
    pub fn new(run_dir: RunDirectory) -> Self {
        Self { run_dir }
    }

    pub fn particles_star(&self) -> PathBuf {
        self.run_dir.extra_path(OUT_SUBTOMOS_STAR)
    }

    pub fn tomograms_star(&self) -> PathBuf {
        self.run_dir.extra_path(OUT_TOMOS_STAR)
    }
}

/// Set of pseudo-subtomograms produced by the data preparation step, as seen by the
/// protocols that consume it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PseudoSubtomogramSet {
    pub name: String,
    pub particles_star: PathBuf,
    pub tomograms_star: PathBuf,
    /// Sampling rate (Å/pix) of the unbinned tilt series.
    pub ts_sampling_rate: f64,
    /// Sampling rate (Å/pix) of the pseudo-subtomograms themselves.
    pub sampling_rate: f64,
}

impl PseudoSubtomogramSet {
    /// Builds the set from the files a data preparation run leaves in its extra directory.
    pub fn from_data_preparation(
        name: impl Into<String>,
        prep: &DataPreparation,
        ts_sampling_rate: f64,
        sampling_rate: f64,
    ) -> Self {
        Self {
            name: name.into(),
            particles_star: prep.particles_star(),
            tomograms_star: prep.tomograms_star(),
            ts_sampling_rate,
            sampling_rate,
        }
    }

    pub fn tomograms(&self) -> &Path {
        &self.tomograms_star
    }

    pub fn ts_sampling_rate(&self) -> f64 {
        self.ts_sampling_rate
    }
}

/// A single particle entry; pseudo-subtomograms are distinguished by carrying a CTF image.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Particle {
    pub location: PathBuf,
    pub ctf_image: Option<PathBuf>,
}

impl Particle {
    pub fn is_pseudo_subtomogram(&self) -> bool {
        self.ctf_image.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Origin {
    /// The default volume origin: the centre of the box, expressed in Å with negative sign.
    pub fn centered(dims: [usize; 3], sampling_rate: f64) -> Self {
        let shift = |n: usize| -(n as f64) / 2.0 * sampling_rate;
        Self {
            x: shift(dims[0]),
            y: shift(dims[1]),
            z: shift(dims[2]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tomogram {
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sampling_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ts_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<Origin>,
}

impl Tomogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_location(&mut self, location: impl Into<PathBuf>) {
        self.location = Some(location.into());
    }

    pub fn set_sampling_rate(&mut self, sampling_rate: f64) {
        self.sampling_rate = Some(sampling_rate);
    }

    pub fn set_origin(&mut self, origin: Origin) {
        self.origin = Some(origin);
    }

    pub fn set_ts_id(&mut self, ts_id: impl Into<String>) {
        self.ts_id = Some(ts_id.into());
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn sampling_rate(&self) -> Option<f64> {
        self.sampling_rate
    }

    pub fn origin(&self) -> Option<Origin> {
        self.origin
    }

    pub fn ts_id(&self) -> Option<&str> {
        self.ts_id.as_deref()
    }
}

/// Provenance edge between an input object and an output derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRelation {
    pub source: String,
    pub target: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_preparation_files_live_in_extra_dir() {
        let prep = DataPreparation::new(RunDirectory::new("/runs/005_prepare"));
        assert_eq!(
            prep.particles_star(),
            PathBuf::from("/runs/005_prepare/extra/particles.star")
        );
        assert_eq!(
            prep.tomograms_star(),
            PathBuf::from("/runs/005_prepare/extra/tomograms.star")
        );
    }

    #[test]
    fn particle_set_from_data_preparation_points_at_its_star_files() {
        let prep = DataPreparation::new(RunDirectory::new("prep"));
        let set = PseudoSubtomogramSet::from_data_preparation("subtomos", &prep, 1.35, 5.4);
        assert_eq!(set.tomograms(), Path::new("prep/extra/tomograms.star"));
        assert_eq!(set.ts_sampling_rate(), 1.35);
    }

    #[test]
    fn particle_with_ctf_image_is_a_pseudo_subtomogram() {
        let mut particle = Particle::default();
        assert!(!particle.is_pseudo_subtomogram());
        particle.ctf_image = Some(PathBuf::from("ctf.mrc"));
        assert!(particle.is_pseudo_subtomogram());
    }

    #[test]
    fn centered_origin_uses_half_box_in_angstroms() {
        let origin = Origin::centered([100, 60, 40], 2.0);
        assert_eq!(origin.x, -100.0);
        assert_eq!(origin.y, -60.0);
        assert_eq!(origin.z, -40.0);
    }

    #[test]
    fn centered_origin_keeps_half_voxel_of_odd_dimensions() {
        let origin = Origin::centered([100, 51, 41], 2.0);
        assert_eq!(origin.x, -100.0);
        assert_eq!(origin.y, -51.0);
        assert_eq!(origin.z, -41.0);
    }

    #[test]
    fn tomogram_setters_round_trip() {
        let mut tomo = Tomogram::new();
        tomo.set_location("extra/TS_01.mrc");
        tomo.set_sampling_rate(10.8);
        tomo.set_ts_id("TS_01");
        assert_eq!(tomo.location(), Some(Path::new("extra/TS_01.mrc")));
        assert_eq!(tomo.sampling_rate(), Some(10.8));
        assert_eq!(tomo.ts_id(), Some("TS_01"));
        assert!(tomo.origin().is_none());
    }
}
