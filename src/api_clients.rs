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

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::Mutex;

use anyhow::{anyhow, Context};
use aws_config::BehaviorVersion;
use aws_sdk_ecs::config::Region;
use aws_sdk_ecs::operation::describe_task_definition::DescribeTaskDefinitionOutput;
use aws_sdk_ecs::operation::describe_tasks::DescribeTasksOutput;
use tracing::{debug, warn};

use crate::ecs::{ContainerDefinition, Page, Task, TaskDefinition};

/// Page size requested from ListClusters and ListTasks.
pub const MAX_RESULTS: i32 = 64;

#[derive(Debug)]
pub struct RealClient {
    ecs: aws_sdk_ecs::Client,
}

pub trait Client {
    async fn list_clusters(&self, next_token: Option<String>) -> anyhow::Result<Page>;

    async fn list_tasks(&self, cluster: &str, next_token: Option<String>) -> anyhow::Result<Page>;

    async fn describe_tasks(&self, cluster: &str, tasks: &[String]) -> anyhow::Result<Vec<Task>>;

    async fn describe_task_definition(&self, task_definition: &str) -> anyhow::Result<TaskDefinition>;
}

impl RealClient {
    /// Loads the AWS configuration from the default provider chain. `region` overrides whatever
    /// region the chain would resolve on its own.
    pub async fn new(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let sdk_config = loader.load().await;

        Self {
            ecs: aws_sdk_ecs::Client::new(&sdk_config),
        }
    }
}

impl Client for RealClient {
    async fn list_clusters(&self, next_token: Option<String>) -> anyhow::Result<Page> {
        debug!(?next_token, "ListClusters");

        let output = self
            .ecs
            .list_clusters()
            .max_results(MAX_RESULTS)
            .set_next_token(next_token)
            .send()
            .await
            .context("ListClusters request failed")?;

        Ok(Page {
            arns: output.cluster_arns().to_vec(),
            next_token: output.next_token().map(str::to_owned),
        })
    }

    async fn list_tasks(&self, cluster: &str, next_token: Option<String>) -> anyhow::Result<Page> {
        debug!(cluster, ?next_token, "ListTasks");

        let output = self
            .ecs
            .list_tasks()
            .cluster(cluster)
            .max_results(MAX_RESULTS)
            .set_next_token(next_token)
            .send()
            .await
            .context("ListTasks request failed")?;

        Ok(Page {
            arns: output.task_arns().to_vec(),
            next_token: output.next_token().map(str::to_owned),
        })
    }

    async fn describe_tasks(&self, cluster: &str, tasks: &[String]) -> anyhow::Result<Vec<Task>> {
        debug!(cluster, count = tasks.len(), "DescribeTasks");

        let output = self
            .ecs
            .describe_tasks()
            .cluster(cluster)
            .set_tasks(Some(tasks.to_vec()))
            .send()
            .await
            .context("DescribeTasks request failed")?;
        tasks_from_output(&output)
    }

    async fn describe_task_definition(&self, task_definition: &str) -> anyhow::Result<TaskDefinition> {
        debug!(task_definition, "DescribeTaskDefinition");

        let output = self
            .ecs
            .describe_task_definition()
            .task_definition(task_definition)
            .send()
            .await
            .context("DescribeTaskDefinition request failed")?;
        task_definition_from_output(task_definition, &output)
    }
}

fn tasks_from_output(output: &DescribeTasksOutput) -> anyhow::Result<Vec<Task>> {
    // tasks that stopped between ListTasks and DescribeTasks end up here
    for failure in output.failures() {
        warn!(
            arn = failure.arn().unwrap_or_default(),
            reason = failure.reason().unwrap_or_default(),
            "could not describe task"
        );
    }

    let mut described = Vec::new();
    for task in output.tasks() {
        let arn = task.task_arn().ok_or_else(|| anyhow!("task without an arn!?"))?;
        let task_definition_arn = task
            .task_definition_arn()
            .ok_or_else(|| anyhow!("task {arn} has no task definition arn"))?;
        described.push(Task {
            arn: arn.to_owned(),
            task_definition_arn: task_definition_arn.to_owned(),
        });
    }

    Ok(described)
}

fn task_definition_from_output(
    requested: &str,
    output: &DescribeTaskDefinitionOutput,
) -> anyhow::Result<TaskDefinition> {
    let definition = output
        .task_definition()
        .ok_or_else(|| anyhow!("response contains no task definition"))?;

    let mut containers = Vec::new();
    for container in definition.container_definitions() {
        let name = container.name().map(str::to_owned);
        let image = container
            .image()
            .ok_or_else(|| anyhow!("container {} has no image", name.as_deref().unwrap_or("<unnamed>")))?;
        containers.push(ContainerDefinition {
            name,
            image: image.to_owned(),
        });
    }

    Ok(TaskDefinition {
        arn: definition.task_definition_arn().unwrap_or(requested).to_owned(),
        containers,
    })
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListClusters,
    ListTasks(String),
    DescribeTasks(String, usize),
    DescribeTaskDefinition(String),
}

/// In-memory ECS. List results are split into pages of `page_size` entries, the continuation token
/// being the offset of the next page.
#[cfg(test)]
#[derive(Debug)]
pub struct MockClient {
    pub page_size: usize,
    pub clusters: Vec<String>,
    pub tasks: HashMap<String, Vec<Task>>,
    pub task_definitions: HashMap<String, TaskDefinition>,
    pub calls: Mutex<Vec<Call>>,
}

#[cfg(test)]
impl MockClient {
    pub fn new() -> Self {
        Self {
            page_size: usize::try_from(MAX_RESULTS).unwrap(),
            clusters: Vec::new(),
            tasks: HashMap::new(),
            task_definitions: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn cluster_arn(name: &str) -> String {
        format!("arn:aws:ecs:eu-de-1:123456789012:cluster/{name}")
    }

    /// Adds a cluster whose tasks are given as (task id, task definition arn) pairs.
    pub fn with_cluster(mut self, name: &str, tasks: &[(&str, &str)]) -> Self {
        let arn = Self::cluster_arn(name);
        let tasks = tasks
            .iter()
            .map(|(id, task_definition_arn)| Task {
                arn: format!("arn:aws:ecs:eu-de-1:123456789012:task/{name}/{id}"),
                task_definition_arn: (*task_definition_arn).to_string(),
            })
            .collect();
        self.clusters.push(arn.clone());
        self.tasks.insert(arn, tasks);
        self
    }

    pub fn with_task_definition(mut self, arn: &str, images: &[&str]) -> Self {
        let containers = images
            .iter()
            .enumerate()
            .map(|(i, image)| ContainerDefinition {
                name: Some(format!("container-{i}")),
                image: (*image).to_string(),
            })
            .collect();
        let task_definition = TaskDefinition {
            arn: arn.to_string(),
            containers,
        };
        self.task_definitions.insert(arn.to_string(), task_definition);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn page(&self, arns: &[String], next_token: Option<String>) -> anyhow::Result<Page> {
        let start = match next_token {
            Some(token) => token.parse::<usize>().context("MockClient got a bogus next_token")?,
            None => 0,
        };
        let end = (start + self.page_size).min(arns.len());
        Ok(Page {
            arns: arns[start..end].to_vec(),
            next_token: (end < arns.len()).then(|| end.to_string()),
        })
    }
}

#[cfg(test)]
impl Client for MockClient {
    async fn list_clusters(&self, next_token: Option<String>) -> anyhow::Result<Page> {
        self.record(Call::ListClusters);
        self.page(&self.clusters, next_token)
    }

    async fn list_tasks(&self, cluster: &str, next_token: Option<String>) -> anyhow::Result<Page> {
        self.record(Call::ListTasks(cluster.to_string()));
        let arns: Vec<String> = self
            .tasks
            .get(cluster)
            .ok_or_else(|| anyhow!("MockClient tasks contains no {}", cluster))?
            .iter()
            .map(|task| task.arn.clone())
            .collect();
        self.page(&arns, next_token)
    }

    async fn describe_tasks(&self, cluster: &str, tasks: &[String]) -> anyhow::Result<Vec<Task>> {
        self.record(Call::DescribeTasks(cluster.to_string(), tasks.len()));
        anyhow::ensure!(tasks.len() <= 100, "DescribeTasks accepts at most 100 tasks");
        let known = self
            .tasks
            .get(cluster)
            .ok_or_else(|| anyhow!("MockClient tasks contains no {}", cluster))?;
        Ok(known.iter().filter(|task| tasks.contains(&task.arn)).cloned().collect())
    }

    async fn describe_task_definition(&self, task_definition: &str) -> anyhow::Result<TaskDefinition> {
        self.record(Call::DescribeTaskDefinition(task_definition.to_string()));
        Ok(self
            .task_definitions
            .get(task_definition)
            .ok_or_else(|| anyhow!("MockClient task_definitions contains no {}", task_definition))?
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_ecs::operation::describe_task_definition::DescribeTaskDefinitionOutput;
    use aws_sdk_ecs::operation::describe_tasks::DescribeTasksOutput;
    use aws_sdk_ecs::types;

    use crate::api_clients::{self, Client, MockClient};

    const TASK: &str = "arn:aws:ecs:eu-de-1:123456789012:task/production/0123456789abcdef";
    const APP: &str = "arn:aws:ecs:eu-de-1:123456789012:task-definition/app:3";

    #[test]
    fn tasks_from_output_skips_failures() {
        let output = DescribeTasksOutput::builder()
            .tasks(types::Task::builder().task_arn(TASK).task_definition_arn(APP).build())
            .failures(
                types::Failure::builder()
                    .arn("arn:aws:ecs:eu-de-1:123456789012:task/production/fedcba9876543210")
                    .reason("MISSING")
                    .build(),
            )
            .build();

        let tasks = api_clients::tasks_from_output(&output).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].arn, TASK);
        assert_eq!(tasks[0].task_definition_arn, APP);
    }

    #[test]
    fn tasks_from_output_requires_task_definition_arn() {
        let output = DescribeTasksOutput::builder()
            .tasks(types::Task::builder().task_arn(TASK).build())
            .build();

        let err = api_clients::tasks_from_output(&output).unwrap_err();
        assert_eq!(err.to_string(), format!("task {TASK} has no task definition arn"));
    }

    #[test]
    fn task_definition_from_output_keeps_container_order() {
        let output = DescribeTaskDefinitionOutput::builder()
            .task_definition(
                types::TaskDefinition::builder()
                    .task_definition_arn(APP)
                    .container_definitions(types::ContainerDefinition::builder().name("app").image("app:v1").build())
                    .container_definitions(
                        types::ContainerDefinition::builder()
                            .name("sidecar")
                            .image("sidecar:v2")
                            .build(),
                    )
                    .build(),
            )
            .build();

        let definition = api_clients::task_definition_from_output(APP, &output).unwrap();
        assert_eq!(definition.arn, APP);
        let images: Vec<&str> = definition.containers.iter().map(|c| c.image.as_str()).collect();
        assert_eq!(images, vec!["app:v1", "sidecar:v2"]);
    }

    #[test]
    fn task_definition_from_output_requires_image() {
        let output = DescribeTaskDefinitionOutput::builder()
            .task_definition(
                types::TaskDefinition::builder()
                    .task_definition_arn(APP)
                    .container_definitions(types::ContainerDefinition::builder().name("app").build())
                    .build(),
            )
            .build();

        let err = api_clients::task_definition_from_output(APP, &output).unwrap_err();
        assert_eq!(err.to_string(), "container app has no image");
    }

    #[test]
    fn task_definition_from_output_requires_task_definition() {
        let output = DescribeTaskDefinitionOutput::builder().build();

        let err = api_clients::task_definition_from_output(APP, &output).unwrap_err();
        assert_eq!(err.to_string(), "response contains no task definition");
    }

    #[tokio::test]
    async fn mock_pages_list_results() {
        let mut client = MockClient::new().with_cluster("a", &[]).with_cluster("b", &[]).with_cluster("c", &[]);
        client.page_size = 2;

        let first = client.list_clusters(None).await.unwrap();
        assert_eq!(first.arns, vec![MockClient::cluster_arn("a"), MockClient::cluster_arn("b")]);
        assert_eq!(first.next_token.as_deref(), Some("2"));

        let second = client.list_clusters(first.next_token).await.unwrap();
        assert_eq!(second.arns, vec![MockClient::cluster_arn("c")]);
        assert!(second.next_token.is_none());
    }
}
