//! Integration tests for the processor module
//!
//! Exercises extraction end to end against temporary source exports shaped
//! like real statistics bureau downloads.

pub mod batch_processing;

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A year-end resident population export as downloaded, BOM included
pub fn population_export() -> String {
    [
        "\u{feff}数据库：分省年度数据",
        "指标：年末常住人口(万人)",
        "时间：最近5年",
        "地区,2023年,2022年,2021年,2020年,2019年",
        "北京市,2185,2184,2189,2189,2190",
        "天津市,1364,1363,1373,1387,1385",
        "浙江省,6627,6577,6540,6468,6375",
        "",
        "注：2020年数据为第七次全国人口普查数据。",
        "数据来源：国家统计局",
    ]
    .join("\n")
}

/// Write `content` to `name` inside `temp_dir`
pub fn write_source(temp_dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = temp_dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}
