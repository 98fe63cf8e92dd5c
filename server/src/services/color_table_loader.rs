use std::path::Path;

use odyssey_shared::MapColorTable;
use tracing::{info, warn};

/// Loads the item colour table. A missing or malformed file leaves the
/// minimap all black rather than stopping the server.
pub async fn load(path: &Path) -> MapColorTable {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "failed to read item colour table");
            return MapColorTable::new();
        }
    };

    match MapColorTable::from_json(&text) {
        Ok(table) => {
            info!(path = %path.display(), "loaded map colours for {} items", table.len());
            table
        }
        Err(e) => {
            warn!(error = %e, path = %path.display(), "failed to parse item colour table");
            MapColorTable::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::load;
    use crate::services::segment_loader::tests::temp_maps_dir;

    #[tokio::test]
    async fn load_reads_colours_and_tolerates_bad_files() {
        let dir = temp_maps_dir();
        let good = dir.join("dat.json");
        let bad = dir.join("broken.json");
        std::fs::write(&good, r#"[{"ID": 1, "MapColor": 255}, {"ID": 2}]"#).expect("write dat");
        std::fs::write(&bad, "[{").expect("write dat");

        let table = load(&good).await;
        assert_eq!(table.map_color(1), Some(255));
        assert_eq!(table.len(), 1);

        assert!(load(&bad).await.is_empty());
        assert!(load(&dir.join("missing.json")).await.is_empty());
    }
}
