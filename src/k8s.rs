//! Kubernetes client for deptail

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::api::{ListParams, LogParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use regex::Regex;

use crate::logs::{LogReader, LogTransport};
use crate::types::StreamOptions;

/// Kubernetes client wrapper
pub struct KubeClient {
    client: kube::Client,
    namespace: String,
}

impl KubeClient {
    /// Connect using the kubeconfig's current context, or an explicitly
    /// chosen one. The effective namespace comes from the context unless
    /// overridden.
    pub async fn connect(context: Option<&str>, namespace: Option<&str>) -> Result<Self> {
        let kubeconfig =
            Kubeconfig::read().context("Failed to read kubeconfig. Is kubectl configured?")?;

        let context_name = context
            .map(str::to_string)
            .or_else(|| kubeconfig.current_context.clone());

        let config = kube::Config::from_custom_kubeconfig(
            kubeconfig,
            &KubeConfigOptions {
                context: context_name.clone(),
                ..Default::default()
            },
        )
        .await
        .context(format!(
            "Failed to create config for context: {}",
            context_name.as_deref().unwrap_or("<current>")
        ))?;

        let namespace = namespace
            .map(str::to_string)
            .unwrap_or_else(|| config.default_namespace.clone());

        let client = kube::Client::try_from(config).context(format!(
            "Failed to create client for context: {}",
            context_name.as_deref().unwrap_or("<current>")
        ))?;

        Ok(Self { client, namespace })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn pods_api(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    /// Resolve the pods belonging to a deployment by name convention:
    /// `<deployment>-<replicaset-hex>-<pod-suffix>`, anchored at the start.
    pub async fn resolve_pods(&self, deployment: &str) -> Result<Vec<String>> {
        let pattern = deployment_pod_pattern(deployment)?;
        let list = self
            .pods_api()
            .list(&ListParams::default())
            .await
            .context(format!("Failed to list pods in {}", self.namespace))?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|pod| pod.metadata.name)
            .filter(|name| pattern.is_match(name))
            .collect())
    }

    /// The log transport for this cluster/namespace
    pub fn log_transport(&self) -> KubeLogTransport {
        KubeLogTransport {
            api: self.pods_api(),
        }
    }
}

fn deployment_pod_pattern(deployment: &str) -> Result<Regex> {
    Regex::new(&format!(
        "^{}-[0-9a-f]+-[0-9a-z]+",
        regex::escape(deployment)
    ))
    .context("Invalid deployment name")
}

/// Log transport over the Kubernetes pod-log subresource
pub struct KubeLogTransport {
    api: Api<Pod>,
}

#[async_trait]
impl LogTransport for KubeLogTransport {
    async fn open(&self, pod: &str, options: &StreamOptions) -> Result<LogReader> {
        let params = LogParams {
            container: options.container.clone(),
            follow: options.follow,
            tail_lines: options.tail_lines,
            ..Default::default()
        };

        let stream = self
            .api
            .log_stream(pod, &params)
            .await
            .context("log stream request failed")?;

        Ok(Box::new(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_pattern_matches_deployment_pods() {
        let re = deployment_pod_pattern("web-api").unwrap();
        assert!(re.is_match("web-api-7d4b9c8f6-x2x9q"));
        assert!(re.is_match("web-api-5f6d8-abc12"));
        assert!(!re.is_match("web-api"));
        assert!(!re.is_match("other-web-api-7d4b9c8f6-x2x9q"));
        // Prefix-named sibling deployments do not match.
        assert!(!re.is_match("web-apiv2-7d4b9c8f6-x2x9q"));
    }

    #[test]
    fn test_pod_pattern_escapes_metacharacters() {
        let re = deployment_pod_pattern("web.api").unwrap();
        assert!(!re.is_match("webXapi-7d4b9c8f6-x2x9q"));
        assert!(re.is_match("web.api-7d4b9c8f6-x2x9q"));
    }
}
