//! Offline lookup of SageMaker framework container images

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageUriError {
    #[error("Unsupported framework: {0}")]
    UnsupportedFramework(String),

    #[error("No {framework} image published in region {region}")]
    UnsupportedRegion { framework: String, region: String },

    #[error("Unsupported image scope '{scope}' for {framework}")]
    UnsupportedScope { framework: String, scope: String },
}

/// What the image is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageScope {
    Training,
    Inference,
    Processing,
}

impl ImageScope {
    fn as_str(&self) -> &'static str {
        match self {
            ImageScope::Training => "training",
            ImageScope::Inference => "inference",
            ImageScope::Processing => "processing",
        }
    }
}

/// Image lookup request
#[derive(Debug, Clone)]
pub struct ImageRequest<'a> {
    pub framework: &'a str,
    pub region: &'a str,
    pub version: &'a str,
    pub py_version: Option<&'a str>,
    pub instance_type: &'a str,
    pub scope: ImageScope,
}

// Deep Learning Containers registry accounts that differ from the default
const DLC_DEFAULT_ACCOUNT: &str = "763104351884";
const DLC_ACCOUNTS: &[(&str, &str)] = &[
    ("af-south-1", "626614931356"),
    ("ap-east-1", "871362719292"),
    ("cn-north-1", "727897471807"),
    ("cn-northwest-1", "727897471807"),
    ("eu-south-1", "692866216735"),
    ("me-south-1", "217643126080"),
];

const SKLEARN_ACCOUNTS: &[(&str, &str)] = &[
    ("ap-northeast-1", "354813040037"),
    ("ap-northeast-2", "366743142698"),
    ("ap-south-1", "720646828776"),
    ("ap-southeast-1", "121021644041"),
    ("ap-southeast-2", "783357654285"),
    ("ca-central-1", "341280168497"),
    ("eu-central-1", "492215442770"),
    ("eu-north-1", "662702820516"),
    ("eu-west-1", "141502667606"),
    ("eu-west-2", "764974769150"),
    ("eu-west-3", "659782779980"),
    ("sa-east-1", "737474898029"),
    ("us-east-1", "683313688378"),
    ("us-east-2", "257758044811"),
    ("us-west-1", "746614075791"),
    ("us-west-2", "246618743249"),
];

/// Resolve the container image URI for a framework
pub fn retrieve(request: &ImageRequest<'_>) -> Result<String, ImageUriError> {
    match request.framework {
        "tensorflow" => tensorflow(request),
        "sklearn" => sklearn(request),
        other => Err(ImageUriError::UnsupportedFramework(other.to_string())),
    }
}

fn tensorflow(request: &ImageRequest<'_>) -> Result<String, ImageUriError> {
    let account = DLC_ACCOUNTS
        .iter()
        .find(|(region, _)| *region == request.region)
        .map(|(_, account)| *account)
        .unwrap_or(DLC_DEFAULT_ACCOUNT);

    let processor = processor_type(request.instance_type);
    let tag = match request.scope {
        ImageScope::Training => match request.py_version {
            Some(py) => format!("{}-{}-{}", request.version, processor, py),
            None => format!("{}-{}", request.version, processor),
        },
        ImageScope::Inference => format!("{}-{}", request.version, processor),
        ImageScope::Processing => {
            return Err(ImageUriError::UnsupportedScope {
                framework: request.framework.to_string(),
                scope: request.scope.as_str().to_string(),
            })
        }
    };

    Ok(format!(
        "{}.dkr.ecr.{}.{}/tensorflow-{}:{}",
        account,
        request.region,
        domain(request.region),
        request.scope.as_str(),
        tag
    ))
}

fn sklearn(request: &ImageRequest<'_>) -> Result<String, ImageUriError> {
    let account = SKLEARN_ACCOUNTS
        .iter()
        .find(|(region, _)| *region == request.region)
        .map(|(_, account)| *account)
        .ok_or_else(|| ImageUriError::UnsupportedRegion {
            framework: request.framework.to_string(),
            region: request.region.to_string(),
        })?;

    // One image serves training, inference and processing
    Ok(format!(
        "{}.dkr.ecr.{}.{}/sagemaker-scikit-learn:{}-cpu-{}",
        account,
        request.region,
        domain(request.region),
        request.version,
        request.py_version.unwrap_or("py3")
    ))
}

fn processor_type(instance_type: &str) -> &'static str {
    let family = instance_type
        .strip_prefix("ml.")
        .and_then(|rest| rest.split('.').next())
        .unwrap_or("");
    if family.starts_with('p') || family.starts_with('g') {
        "gpu"
    } else {
        "cpu"
    }
}

fn domain(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        "amazonaws.com.cn"
    } else {
        "amazonaws.com"
    }
}
