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

/// One page of ARNs as returned by a ListClusters or ListTasks call.
#[derive(Clone, Debug)]
pub struct Page {
    pub arns: Vec<String>,
    pub next_token: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Task {
    pub arn: String,
    pub task_definition_arn: String,
}

#[derive(Clone, Debug)]
pub struct TaskDefinition {
    pub arn: String,
    pub containers: Vec<ContainerDefinition>,
}

#[derive(Clone, Debug)]
pub struct ContainerDefinition {
    pub name: Option<String>,
    pub image: String,
}

/// Returns the short name of a cluster, i.e. the last path segment of
/// `arn:aws:ecs:<region>:<account>:cluster/<name>`.
pub fn cluster_name(arn: &str) -> &str {
    arn.rsplit('/').next().unwrap_or(arn)
}
