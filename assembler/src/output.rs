use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `bytes` next to `path` and renames it into place, so a failed
/// write never leaves a truncated file under the final name.
pub fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    let tmp = tmp_path(path);
    let result = File::create(&tmp)
        .and_then(|mut f| f.write_all(bytes).and_then(|_| f.sync_all()))
        .and_then(|_| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_target_and_cleans_up() {
        let dir = std::env::temp_dir().join(format!("r8asm-output-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("machine_code.bin");

        write_atomic(&path, &[1, 2, 3]).unwrap();
        write_atomic(&path, &[4]).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![4]);
        assert!(!tmp_path(&path).exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn failed_write_leaves_nothing() {
        let path = std::env::temp_dir()
            .join(format!("r8asm-missing-{}", std::process::id()))
            .join("out.bin");
        assert!(write_atomic(&path, &[1]).is_err());
        assert!(!path.exists());
    }
}
