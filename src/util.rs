use std::iter::repeat;
use std::path::{Path, PathBuf};

pub fn find_first_subpath<P: AsRef<Path>, F: Fn(&Path) -> bool>(
    root: impl AsRef<Path>,
    subpaths: &[P],
    search: F,
) -> Option<PathBuf> {
    subpaths
        .iter()
        .zip(repeat(root.as_ref()))
        .map(|(b, a)| a.join(b))
        .find(|it: &PathBuf| search(it))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_existing_subpath_wins() {
        let found = find_first_subpath(".", &["no-such-file.yml", "Cargo.toml"], Path::exists);
        assert_eq!(found, Some(PathBuf::from("./Cargo.toml")));
    }

    #[test]
    fn no_match_is_none() {
        let found = find_first_subpath(".", &["a.missing", "b.missing"], Path::exists);
        assert_eq!(found, None);
    }
}
