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

use std::collections::HashSet;

use anyhow::{bail, Context};
use tracing::{debug, info, trace};

use crate::api_clients::Client;
use crate::config::{ClusterSelection, Config};
use crate::images::ImageList;

/// DescribeTasks rejects requests with more task ARNs than this.
pub const DESCRIBE_TASKS_BATCH_SIZE: usize = 100;

/// Walks clusters -> tasks -> task definitions -> container images for every selected cluster.
/// All calls are made one after another and the first error aborts the whole walk.
pub async fn collect_images<C: Client>(client: &C, config: &Config) -> Result<ImageList, anyhow::Error> {
    let clusters = list_clusters(client).await?;
    let clusters = select_clusters(clusters, &config.cluster)?;

    let mut images = Vec::new();
    for cluster in &clusters {
        let cluster_images = images_for_cluster(client, cluster)
            .await
            .with_context(|| format!("while collecting images of cluster {cluster}"))?;
        info!(cluster = %cluster, images = cluster_images.len(), "collected images");
        images.extend(cluster_images);
    }

    let mut image_list = ImageList::new(images);
    if config.sort {
        image_list.sort();
    }
    Ok(image_list)
}

pub async fn list_clusters<C: Client>(client: &C) -> Result<Vec<String>, anyhow::Error> {
    let mut clusters = Vec::new();
    let mut next_token = None;
    loop {
        let page = client
            .list_clusters(next_token)
            .await
            .context("failed to list clusters")?;
        clusters.extend(page.arns);
        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    debug!(count = clusters.len(), "listed clusters");
    Ok(clusters)
}

/// Narrows the enumerated clusters down to the selected one, failing if it does not exist.
pub fn select_clusters(clusters: Vec<String>, selection: &ClusterSelection) -> Result<Vec<String>, anyhow::Error> {
    match selection {
        ClusterSelection::All => Ok(clusters),
        ClusterSelection::Named(name) => match clusters.into_iter().find(|arn| selection.matches(arn)) {
            Some(arn) => Ok(vec![arn]),
            None => bail!("cluster {name} not found"),
        },
    }
}

pub async fn images_for_cluster<C: Client>(client: &C, cluster: &str) -> Result<Vec<String>, anyhow::Error> {
    let tasks = list_tasks(client, cluster).await?;
    let definitions = task_definitions(client, cluster, &tasks).await?;
    images_for_task_definitions(client, &definitions).await
}

pub async fn list_tasks<C: Client>(client: &C, cluster: &str) -> Result<Vec<String>, anyhow::Error> {
    let mut tasks = Vec::new();
    let mut next_token = None;
    loop {
        let page = client
            .list_tasks(cluster, next_token)
            .await
            .with_context(|| format!("failed to list tasks in cluster {cluster}"))?;
        tasks.extend(page.arns);
        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    debug!(cluster, count = tasks.len(), "listed tasks");
    Ok(tasks)
}

/// Returns the distinct task definitions referenced by `tasks`, in no particular order.
pub async fn task_definitions<C: Client>(
    client: &C,
    cluster: &str,
    tasks: &[String],
) -> Result<Vec<String>, anyhow::Error> {
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    let mut definitions = HashSet::new();
    for batch in tasks.chunks(DESCRIBE_TASKS_BATCH_SIZE) {
        let described = client
            .describe_tasks(cluster, batch)
            .await
            .with_context(|| format!("failed to describe tasks in cluster {cluster}"))?;
        for task in described {
            trace!(task = %task.arn, task_definition = %task.task_definition_arn, "resolved task");
            definitions.insert(task.task_definition_arn);
        }
    }

    Ok(definitions.into_iter().collect())
}

/// Images of all containers in `definitions`, in order and with repetitions.
pub async fn images_for_task_definitions<C: Client>(
    client: &C,
    definitions: &[String],
) -> Result<Vec<String>, anyhow::Error> {
    let mut images = Vec::new();
    for definition in definitions {
        let task_definition = client
            .describe_task_definition(definition)
            .await
            .with_context(|| format!("failed to describe task definition {definition}"))?;
        for container in task_definition.containers {
            trace!(
                task_definition = %task_definition.arn,
                container = container.name.as_deref().unwrap_or_default(),
                image = %container.image,
                "found image"
            );
            images.push(container.image);
        }
    }

    Ok(images)
}
