//! Model package registration

use crate::core::value::PipelineValue;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Location of a metrics document attached to a model package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSource {
    pub s3_uri: String,
    pub content_type: String,
}

impl MetricsSource {
    pub fn to_definition(&self) -> Value {
        json!({ "ContentType": self.content_type, "S3Uri": self.s3_uri })
    }
}

/// Provenance metrics for a registered model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub model_statistics: Option<MetricsSource>,
}

impl ModelMetrics {
    pub fn to_definition(&self) -> Value {
        let mut quality = Map::new();
        if let Some(stats) = &self.model_statistics {
            quality.insert("Statistics".to_string(), stats.to_definition());
        }
        json!({ "ModelQuality": quality })
    }
}

/// Registers the trained model into a model package group
#[derive(Debug, Clone)]
pub struct RegisterModelStep {
    pub name: String,
    pub model_package_group_name: String,
    pub image_uri: String,
    pub model_data: PipelineValue,
    pub content_types: Vec<String>,
    pub response_types: Vec<String>,
    pub inference_instances: Vec<PipelineValue>,
    pub transform_instances: Vec<PipelineValue>,
    pub approval_status: PipelineValue,
    pub model_metrics: Option<ModelMetrics>,
}

impl RegisterModelStep {
    pub fn arguments(&self) -> Value {
        let to_values = |values: &[PipelineValue]| -> Vec<Value> {
            values.iter().map(PipelineValue::to_definition).collect()
        };

        let mut args = json!({
            "ModelPackageGroupName": self.model_package_group_name,
            "InferenceSpecification": {
                "Containers": [{
                    "Image": self.image_uri,
                    "ModelDataUrl": self.model_data.to_definition(),
                }],
                "SupportedContentTypes": self.content_types,
                "SupportedResponseMIMETypes": self.response_types,
                "SupportedRealtimeInferenceInstanceTypes": to_values(&self.inference_instances),
                "SupportedTransformInstanceTypes": to_values(&self.transform_instances),
            },
            "ModelApprovalStatus": self.approval_status.to_definition(),
        });
        if let Some(metrics) = &self.model_metrics {
            args["ModelMetrics"] = metrics.to_definition();
        }
        args
    }

    pub fn to_definition(&self) -> Value {
        json!({
            "Name": self.name,
            "Type": "RegisterModel",
            "Arguments": self.arguments(),
        })
    }
}
