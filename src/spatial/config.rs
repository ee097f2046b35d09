// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Spatial tree configuration

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};

/// Default file looked up by [`BvhConfig::load`]
pub const CONFIG_FILE: &str = "bvh.toml";

/// Environment variable overriding the leaf size
pub const ENV_LEAF_SIZE: &str = "POLYFRAME_BVH_LEAF_SIZE";

/// Environment variable overriding the split policy
pub const ENV_SPLIT: &str = "POLYFRAME_BVH_SPLIT";

/// Where an interior node divides its items along the axis of largest spread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitPolicy {
    /// Halfway between the smallest and largest center coordinate
    #[serde(alias = "mean")]
    Midpoint,
    /// At the lower median center coordinate
    #[default]
    Median,
}

impl fmt::Display for SplitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitPolicy::Midpoint => write!(f, "midpoint"),
            SplitPolicy::Median => write!(f, "median"),
        }
    }
}

impl FromStr for SplitPolicy {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "midpoint" | "mean" => Ok(SplitPolicy::Midpoint),
            "median" => Ok(SplitPolicy::Median),
            _ => Err(GeometryError::invalid_param(
                "split",
                s,
                "expected 'midpoint' or 'median'",
            )),
        }
    }
}

/// Build parameters of a [`BvhTree`](super::BvhTree)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhConfig {
    /// Largest number of items stored in a leaf
    pub leaf_size: usize,
    /// Split position policy
    pub split: SplitPolicy,
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self {
            leaf_size: 8,
            split: SplitPolicy::Median,
        }
    }
}

impl BvhConfig {
    pub fn new(leaf_size: usize, split: SplitPolicy) -> Self {
        Self { leaf_size, split }
    }

    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size;
        self
    }

    pub fn with_split(mut self, split: SplitPolicy) -> Self {
        self.split = split;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.leaf_size == 0 {
            return Err(GeometryError::invalid_param(
                "leaf_size",
                self.leaf_size,
                "leaves must hold at least one item",
            ));
        }
        Ok(())
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: BvhConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load `bvh.toml` from the working directory if present, then apply
    /// environment variable overrides
    pub fn load() -> anyhow::Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup such as the process environment.
    /// Unparsable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(ENV_LEAF_SIZE) {
            match value.trim().parse() {
                Ok(leaf_size) => self.leaf_size = leaf_size,
                Err(_) => tracing::warn!(key = ENV_LEAF_SIZE, %value, "ignoring unparsable override"),
            }
        }
        if let Some(value) = lookup(ENV_SPLIT) {
            match value.parse() {
                Ok(split) => self.split = split,
                Err(_) => tracing::warn!(key = ENV_SPLIT, %value, "ignoring unparsable override"),
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }
}
