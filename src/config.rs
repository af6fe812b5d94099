// Copyright 2024 SAP SE
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::ecs;
use crate::Cli;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClusterSelection {
    All,
    /// A cluster name or full cluster ARN.
    Named(String),
}

impl ClusterSelection {
    pub fn matches(&self, cluster_arn: &str) -> bool {
        match self {
            ClusterSelection::All => true,
            ClusterSelection::Named(name) => name == cluster_arn || name == ecs::cluster_name(cluster_arn),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub cluster: ClusterSelection,
    pub region: Option<String>,
    pub sort: bool,
    pub pretty: bool,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Self {
        // ECS_CLUSTER= counts as unset
        let cluster = match cli.cluster.as_deref().map(str::trim) {
            None | Some("") => ClusterSelection::All,
            Some(name) => ClusterSelection::Named(name.to_string()),
        };

        Self {
            cluster,
            region: cli.region.clone().filter(|region| !region.is_empty()),
            sort: cli.sort,
            pretty: cli.pretty,
        }
    }
}
