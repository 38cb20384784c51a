use edgecheck_e2e::fs_tree::build_temp_dir;
use edgecheck_e2e::{materialize, DirEntry, DirectoryTree};
use walkdir::WalkDir;

fn nested_tree() -> DirectoryTree {
    DirectoryTree::new()
        .file("README.md", "# héllo wörld\n")
        .file("no-newline.txt", "trailing")
        .dir(
            "src",
            DirectoryTree::new()
                .file("index.php", "<?php\necho 'hi';\r\n")
                .dir(
                    "lib",
                    DirectoryTree::new().file("deep.js", "export const x = '🦀';"),
                ),
        )
        .dir("empty", DirectoryTree::new())
}

/// Writing a tree and reading it back yields the same files byte for byte
#[test]
fn round_trip_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let tree = nested_tree();

    materialize(dir.path(), &tree).unwrap();

    let mut files: Vec<String> = WalkDir::new(dir.path())
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(dir.path())
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    assert_eq!(
        files,
        [
            "README.md",
            "no-newline.txt",
            "src/index.php",
            "src/lib/deep.js"
        ]
    );

    assert_eq!(
        std::fs::read(dir.path().join("src/lib/deep.js")).unwrap(),
        "export const x = '🦀';".as_bytes()
    );
    assert_eq!(DirectoryTree::from_dir(dir.path()).unwrap(), tree);
}

#[test]
fn temp_dir_contains_tree() {
    let tree: DirectoryTree = [("app.yaml", DirEntry::File("kind: x\n".to_string()))]
        .into_iter()
        .collect();

    let dir = build_temp_dir(&tree).unwrap();
    assert_eq!(DirectoryTree::from_dir(&dir).unwrap(), tree);

    std::fs::remove_dir_all(dir).unwrap();
}
