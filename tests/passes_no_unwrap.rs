use std::fs;
use std::path::Path;

/// Engine passes run on every edit and must report problems as data, not panic.
#[test]
fn passes_do_not_unwrap() {
    for file in ["index.rs", "plan.rs", "validate.rs", "model.rs", "catalog.rs"] {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("src").join(file);
        let src = fs::read_to_string(&path).expect("failed to read engine source");
        let body = src.split("#[cfg(test)]").next().unwrap_or_default();
        assert!(
            !body.contains(".unwrap()") && !body.contains(".expect("),
            "{file} must not unwrap outside its tests"
        );
    }
}
