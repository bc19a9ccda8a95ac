use aws_config::meta::region::RegionProviderChain;
use aws_config::SdkConfig;
use aws_sdk_s3::config::Region;

/// Shared SDK config: the configured region first, then the default chain.
pub(crate) async fn sdk_config(region: &str) -> SdkConfig {
    let region = RegionProviderChain::first_try(Region::new(region.to_string()))
        .or_default_provider()
        .or_else("us-east-1");
    aws_config::from_env().region(region).load().await
}
