use aws_sdk_s3::error::DisplayErrorContext;
use lab_stack_lambda::adapters::object_store::{ObjectLister, ObjectListing};
use lab_stack_lambda::handlers::list_objects::{
    config_error_response, handle_list_objects, LambdaResponse, ListObjectsConfig,
};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use tracing_subscriber::EnvFilter;

struct S3ObjectLister {
    s3_client: aws_sdk_s3::Client,
}

impl ObjectLister for S3ObjectLister {
    fn list_objects(&self, bucket: &str) -> Result<ObjectListing, String> {
        let bucket = bucket.to_string();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .list_objects_v2()
                    .bucket(bucket)
                    .send()
                    .await
                    .map_err(|error| format!("{}", DisplayErrorContext(&error)))?;

                let keys: Vec<String> = output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string))
                    .collect();
                let key_count = output
                    .key_count()
                    .and_then(|count| usize::try_from(count).ok())
                    .unwrap_or(keys.len());

                Ok(ObjectListing { key_count, keys })
            })
        })
    }
}

async fn handle_request(event: LambdaEvent<serde_json::Value>) -> Result<LambdaResponse, Error> {
    tracing::debug!(
        component = "list_objects_lambda",
        event = "invocation_received",
        request_id = %event.context.request_id,
    );

    let config = match ListObjectsConfig::from_lookup(|name| std::env::var(name).ok()) {
        Ok(config) => config,
        Err(error) => return Ok(config_error_response(error)),
    };

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let lister = S3ObjectLister {
        s3_client: aws_sdk_s3::Client::new(&aws_config),
    };

    Ok(handle_list_objects(&config, &lister))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .without_time()
        .init();

    lambda_runtime::run(service_fn(handle_request)).await
}
