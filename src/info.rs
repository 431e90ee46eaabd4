//! Build information: package identity and the Cargo features compiled in.

// Build-time generated list of compiled features
#[allow(dead_code)]
mod built {
    include!(concat!(env!("OUT_DIR"), "/compiled_features.rs"));
}

/// Native filter operators the embedded driver evaluates.
pub const FILTER_OPERATORS: &[&str] = &[
    "$eq", "$ne", "$gt", "$gte", "$lt", "$lte", "$in", "$nin", "$exists", "$regex", "$options",
    "$and", "$or", "$nor",
];

/// Native update operators the embedded driver applies.
pub const UPDATE_OPERATORS: &[&str] = &["$set", "$unset", "$inc", "$push", "$pull", "$pullAll"];

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InfoReport {
    pub package_name: String,
    pub package_version: String,
    pub compiled_features: Vec<String>,
    pub regex_enabled: bool,
    pub filter_operators: Vec<String>,
    pub update_operators: Vec<String>,
}

pub fn info() -> InfoReport {
    let owned = |list: &[&str]| list.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
    InfoReport {
        package_name: env!("CARGO_PKG_NAME").to_string(),
        package_version: env!("CARGO_PKG_VERSION").to_string(),
        compiled_features: owned(built::COMPILED_FEATURES),
        regex_enabled: cfg!(feature = "regex"),
        filter_operators: owned(FILTER_OPERATORS),
        update_operators: owned(UPDATE_OPERATORS),
    }
}
