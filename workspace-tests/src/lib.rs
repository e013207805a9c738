//! Shared fixtures for the cross-crate tests

use std::path::Path;

/// Configuration used by the end-to-end tests. `store.path` is filled in
/// per test so each one gets its own store file.
pub fn fixture_config(store_path: &Path) -> String {
    format!(
        r#"
[store]
path = "{}"

[checkin]
accounts = [
    ["Dai Meng", "1008087fdf9050810e3723234bd73bc5520ce3"],
    ["Xu Jiaqi", "1008088eff12bed3b5e7682f4207b03685da34"],
    ["Yu Shuxin", "10080867e85b80401d7e932176493991acf1e7"],
]

[outbound]
ssids = ["Tech", "MyWifi"]
"#,
        store_path.display().to_string().replace('\\', "/")
    )
}
