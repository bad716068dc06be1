//! Overpass QL query construction

use osmcache_core::models::{BoundingBox, Category};

/// Overpass tag filters selecting a category's elements
pub fn tag_filters(category: Category) -> &'static [&'static str] {
    match category {
        Category::Schools => &[r#""amenity"="school""#],
        Category::Kindergarden => &[r#""amenity"="kindergarten""#, r#""amenity"="childcare""#],
        Category::Transportation => &[r#""highway"="bus_stop""#, r#""railway"="station""#],
        Category::Airports => &[r#""aeroway"="terminal""#],
        Category::LeisureParks => &[
            r#""leisure"~".""#,
            r#""landuse"~"park|forest|meadow|grass|recreation_ground|village_green""#,
            r#""natural"~"wood|grassland""#,
            r#""boundary"="protected_area""#,
        ],
        Category::Shops => &[r#""shop"~".""#],
        Category::HigherEducation => &[r#""amenity"="university""#],
        Category::FurtherEducation => &[r#""amenity"="college""#],
        Category::Hospitals => &[r#""healthcare"="hospital""#],
    }
}

/// Bbox in Overpass order: south,west,north,east
pub fn overpass_bbox(bbox: &BoundingBox) -> String {
    format!("{},{},{},{}", bbox.ymin, bbox.xmin, bbox.ymax, bbox.xmax)
}

/// Build the union query for one category
///
/// Matching elements are printed with tags; the recursion prints the nodes
/// and member ways they reference without tags.
pub fn build_query(category: Category, bbox: &BoundingBox, timeout_secs: u64) -> String {
    let bbox_str = overpass_bbox(bbox);
    let bbox_ref = bbox_str.as_str();

    let parts: Vec<String> = tag_filters(category)
        .iter()
        .flat_map(|filter| {
            ["node", "way", "relation"]
                .into_iter()
                .map(move |kind| format!("{}[{}]({})", kind, filter, bbox_ref))
        })
        .collect();

    format!("[out:json][timeout:{}];({};);out body;>;out skel qt;", timeout_secs, parts.join(";"))
}
