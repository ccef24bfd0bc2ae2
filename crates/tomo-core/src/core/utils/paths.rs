use crate::core::constants::MRC_EXTENSIONS;
use std::path::{Path, PathBuf};

/// Number of slices of an image file whose header reports `z` slices and `n` images.
///
/// MRC stacks of 2D images are stored with `z == 1` and the image count in `n`; those
/// are treated as volumes with `n` slices.
pub fn manage_dims(file_name: &str, z: usize, n: usize) -> usize {
    if has_mrc_extension(Path::new(file_name)) && z == 1 && n != 1 {
        n
    } else {
        z
    }
}

pub fn has_mrc_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MRC_EXTENSIONS.iter().any(|m| ext.eq_ignore_ascii_case(m)))
}

/// Resolves a file referenced from a star file.
///
/// Relative paths inside star files are relative to the directory holding the star file.
pub fn resolve_star_relative(star_dir: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        star_dir.join(file)
    }
}

/// Prefixes a file's basename with its parent directory name (`TS_01/tomo.mrc` becomes
/// `TS_01_tomo.mrc`), reducing name clashes when linking files into a single directory.
pub fn two_level_basename(full_file_name: &str) -> String {
    let parts: Vec<&str> = full_file_name.split('/').collect();
    match parts.as_slice() {
        [.., parent, base] => format!("{}_{}", parent, base),
        _ => full_file_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mrc_stacks_report_image_count_as_depth() {
        assert_eq!(manage_dims("stack.mrc", 1, 40), 40);
        assert_eq!(manage_dims("stack.map", 1, 40), 40);
    }

    #[test]
    fn volumes_and_other_formats_keep_z() {
        assert_eq!(manage_dims("vol.mrc", 64, 1), 64);
        assert_eq!(manage_dims("single.mrc", 1, 1), 1);
        assert_eq!(manage_dims("stack.st", 1, 40), 1);
        assert_eq!(manage_dims("noext", 1, 40), 1);
    }

    #[test]
    fn relative_star_entries_are_joined_to_star_dir() {
        let star_dir = Path::new("/data/prep/extra");
        assert_eq!(
            resolve_star_relative(star_dir, Path::new("tomos/TS_01.mrc")),
            PathBuf::from("/data/prep/extra/tomos/TS_01.mrc")
        );
        assert_eq!(
            resolve_star_relative(star_dir, Path::new("/abs/TS_01.mrc")),
            PathBuf::from("/abs/TS_01.mrc")
        );
    }

    #[test]
    fn two_level_basename_prefixes_parent() {
        assert_eq!(two_level_basename("a/b/TS_01/tomo.mrc"), "TS_01_tomo.mrc");
        assert_eq!(two_level_basename("tomo.mrc"), "tomo.mrc");
        assert_eq!(two_level_basename("/tomo.mrc"), "_tomo.mrc");
    }
}
