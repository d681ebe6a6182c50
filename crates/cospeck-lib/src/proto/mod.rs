//! CRI `runtime.v1` protobuf types and clients
//!
//! Only the messages and fields the benchmark uses are declared. Field tags
//! match `k8s.io/cri-api/pkg/apis/runtime/v1/api.proto`, so unknown fields
//! sent by the runtime are skipped on decode.

pub mod runtime {
    pub mod v1 {
        use prost::Message;
        use std::collections::HashMap;

        #[derive(Clone, PartialEq, Message)]
        pub struct VersionRequest {
            #[prost(string, tag = "1")]
            pub version: String,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct VersionResponse {
            #[prost(string, tag = "1")]
            pub version: String,
            #[prost(string, tag = "2")]
            pub runtime_name: String,
            #[prost(string, tag = "3")]
            pub runtime_version: String,
            #[prost(string, tag = "4")]
            pub runtime_api_version: String,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct PodSandboxMetadata {
            #[prost(string, tag = "1")]
            pub name: String,
            #[prost(string, tag = "2")]
            pub uid: String,
            #[prost(string, tag = "3")]
            pub namespace: String,
            #[prost(uint32, tag = "4")]
            pub attempt: u32,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct DnsConfig {
            #[prost(string, repeated, tag = "1")]
            pub servers: Vec<String>,
            #[prost(string, repeated, tag = "2")]
            pub searches: Vec<String>,
            #[prost(string, repeated, tag = "3")]
            pub options: Vec<String>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct PodSandboxConfig {
            #[prost(message, optional, tag = "1")]
            pub metadata: Option<PodSandboxMetadata>,
            #[prost(string, tag = "2")]
            pub hostname: String,
            #[prost(string, tag = "3")]
            pub log_directory: String,
            #[prost(message, optional, tag = "4")]
            pub dns_config: Option<DnsConfig>,
            #[prost(map = "string, string", tag = "6")]
            pub labels: HashMap<String, String>,
            #[prost(map = "string, string", tag = "7")]
            pub annotations: HashMap<String, String>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct RunPodSandboxRequest {
            #[prost(message, optional, tag = "1")]
            pub config: Option<PodSandboxConfig>,
            #[prost(string, tag = "2")]
            pub runtime_handler: String,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct RunPodSandboxResponse {
            #[prost(string, tag = "1")]
            pub pod_sandbox_id: String,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct StopPodSandboxRequest {
            #[prost(string, tag = "1")]
            pub pod_sandbox_id: String,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct StopPodSandboxResponse {}

        #[derive(Clone, PartialEq, Message)]
        pub struct RemovePodSandboxRequest {
            #[prost(string, tag = "1")]
            pub pod_sandbox_id: String,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct RemovePodSandboxResponse {}

        #[derive(Clone, PartialEq, Message)]
        pub struct PodSandboxFilter {
            #[prost(string, tag = "1")]
            pub id: String,
            #[prost(map = "string, string", tag = "3")]
            pub label_selector: HashMap<String, String>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ListPodSandboxRequest {
            #[prost(message, optional, tag = "1")]
            pub filter: Option<PodSandboxFilter>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct PodSandbox {
            #[prost(string, tag = "1")]
            pub id: String,
            #[prost(message, optional, tag = "2")]
            pub metadata: Option<PodSandboxMetadata>,
            #[prost(int32, tag = "3")]
            pub state: i32,
            #[prost(int64, tag = "4")]
            pub created_at: i64,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ListPodSandboxResponse {
            #[prost(message, repeated, tag = "1")]
            pub items: Vec<PodSandbox>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ImageSpec {
            #[prost(string, tag = "1")]
            pub image: String,
            #[prost(map = "string, string", tag = "2")]
            pub annotations: HashMap<String, String>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct KeyValue {
            #[prost(string, tag = "1")]
            pub key: String,
            #[prost(string, tag = "2")]
            pub value: String,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ContainerMetadata {
            #[prost(string, tag = "1")]
            pub name: String,
            #[prost(uint32, tag = "2")]
            pub attempt: u32,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ContainerConfig {
            #[prost(message, optional, tag = "1")]
            pub metadata: Option<ContainerMetadata>,
            #[prost(message, optional, tag = "2")]
            pub image: Option<ImageSpec>,
            #[prost(string, repeated, tag = "3")]
            pub command: Vec<String>,
            #[prost(string, repeated, tag = "4")]
            pub args: Vec<String>,
            #[prost(string, tag = "5")]
            pub working_dir: String,
            #[prost(message, repeated, tag = "6")]
            pub envs: Vec<KeyValue>,
            #[prost(map = "string, string", tag = "9")]
            pub labels: HashMap<String, String>,
            #[prost(map = "string, string", tag = "10")]
            pub annotations: HashMap<String, String>,
            #[prost(string, tag = "11")]
            pub log_path: String,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct CreateContainerRequest {
            #[prost(string, tag = "1")]
            pub pod_sandbox_id: String,
            #[prost(message, optional, tag = "2")]
            pub config: Option<ContainerConfig>,
            #[prost(message, optional, tag = "3")]
            pub sandbox_config: Option<PodSandboxConfig>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct CreateContainerResponse {
            #[prost(string, tag = "1")]
            pub container_id: String,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct StartContainerRequest {
            #[prost(string, tag = "1")]
            pub container_id: String,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct StartContainerResponse {}

        #[derive(Clone, PartialEq, Message)]
        pub struct ContainerStatsFilter {
            #[prost(string, tag = "1")]
            pub id: String,
            #[prost(string, tag = "2")]
            pub pod_sandbox_id: String,
            #[prost(map = "string, string", tag = "3")]
            pub label_selector: HashMap<String, String>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ListContainerStatsRequest {
            #[prost(message, optional, tag = "1")]
            pub filter: Option<ContainerStatsFilter>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ListContainerStatsResponse {
            #[prost(message, repeated, tag = "1")]
            pub stats: Vec<ContainerStats>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ContainerAttributes {
            #[prost(string, tag = "1")]
            pub id: String,
            #[prost(message, optional, tag = "2")]
            pub metadata: Option<ContainerMetadata>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct UInt64Value {
            #[prost(uint64, tag = "1")]
            pub value: u64,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct CpuUsage {
            #[prost(int64, tag = "1")]
            pub timestamp: i64,
            #[prost(message, optional, tag = "2")]
            pub usage_core_nano_seconds: Option<UInt64Value>,
            #[prost(message, optional, tag = "3")]
            pub usage_nano_cores: Option<UInt64Value>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct MemoryUsage {
            #[prost(int64, tag = "1")]
            pub timestamp: i64,
            #[prost(message, optional, tag = "2")]
            pub working_set_bytes: Option<UInt64Value>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct FilesystemUsage {
            #[prost(int64, tag = "1")]
            pub timestamp: i64,
            #[prost(message, optional, tag = "3")]
            pub used_bytes: Option<UInt64Value>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ContainerStats {
            #[prost(message, optional, tag = "1")]
            pub attributes: Option<ContainerAttributes>,
            #[prost(message, optional, tag = "2")]
            pub cpu: Option<CpuUsage>,
            #[prost(message, optional, tag = "3")]
            pub memory: Option<MemoryUsage>,
            #[prost(message, optional, tag = "4")]
            pub writable_layer: Option<FilesystemUsage>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ImageStatusRequest {
            #[prost(message, optional, tag = "1")]
            pub image: Option<ImageSpec>,
            #[prost(bool, tag = "2")]
            pub verbose: bool,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct Image {
            #[prost(string, tag = "1")]
            pub id: String,
            #[prost(string, repeated, tag = "2")]
            pub repo_tags: Vec<String>,
            #[prost(uint64, tag = "4")]
            pub size: u64,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ImageStatusResponse {
            #[prost(message, optional, tag = "1")]
            pub image: Option<Image>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct PullImageRequest {
            #[prost(message, optional, tag = "1")]
            pub image: Option<ImageSpec>,
            #[prost(message, optional, tag = "3")]
            pub sandbox_config: Option<PodSandboxConfig>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct PullImageResponse {
            #[prost(string, tag = "1")]
            pub image_ref: String,
        }

        pub mod runtime_service_client {
            use super::*;
            use tonic::codegen::*;

            #[derive(Debug, Clone)]
            pub struct RuntimeServiceClient<T> {
                inner: tonic::client::Grpc<T>,
            }

            impl RuntimeServiceClient<tonic::transport::Channel> {
                pub fn new(channel: tonic::transport::Channel) -> Self {
                    let inner = tonic::client::Grpc::new(channel);
                    Self { inner }
                }
            }

            impl<T> RuntimeServiceClient<T>
            where
                T: tonic::client::GrpcService<tonic::body::BoxBody>,
                T::Error: Into<StdError>,
                T::ResponseBody: Body<Data = Bytes> + Send + 'static,
                <T::ResponseBody as Body>::Error: Into<StdError> + Send,
            {
                async fn call<Req, Resp>(
                    &mut self,
                    request: impl tonic::IntoRequest<Req>,
                    path: &'static str,
                ) -> Result<tonic::Response<Resp>, tonic::Status>
                where
                    Req: prost::Message + Send + Sync + 'static,
                    Resp: prost::Message + Default + Send + Sync + 'static,
                {
                    self.inner.ready().await.map_err(|e| {
                        tonic::Status::new(
                            tonic::Code::Unknown,
                            format!("Service was not ready: {}", e.into()),
                        )
                    })?;
                    let codec = tonic::codec::ProstCodec::default();
                    let path = http::uri::PathAndQuery::from_static(path);
                    self.inner.unary(request.into_request(), path, codec).await
                }

                pub async fn version(
                    &mut self,
                    request: impl tonic::IntoRequest<VersionRequest>,
                ) -> Result<tonic::Response<VersionResponse>, tonic::Status> {
                    self.call(request, "/runtime.v1.RuntimeService/Version")
                        .await
                }

                pub async fn run_pod_sandbox(
                    &mut self,
                    request: impl tonic::IntoRequest<RunPodSandboxRequest>,
                ) -> Result<tonic::Response<RunPodSandboxResponse>, tonic::Status> {
                    self.call(request, "/runtime.v1.RuntimeService/RunPodSandbox")
                        .await
                }

                pub async fn stop_pod_sandbox(
                    &mut self,
                    request: impl tonic::IntoRequest<StopPodSandboxRequest>,
                ) -> Result<tonic::Response<StopPodSandboxResponse>, tonic::Status> {
                    self.call(request, "/runtime.v1.RuntimeService/StopPodSandbox")
                        .await
                }

                pub async fn remove_pod_sandbox(
                    &mut self,
                    request: impl tonic::IntoRequest<RemovePodSandboxRequest>,
                ) -> Result<tonic::Response<RemovePodSandboxResponse>, tonic::Status> {
                    self.call(request, "/runtime.v1.RuntimeService/RemovePodSandbox")
                        .await
                }

                pub async fn list_pod_sandbox(
                    &mut self,
                    request: impl tonic::IntoRequest<ListPodSandboxRequest>,
                ) -> Result<tonic::Response<ListPodSandboxResponse>, tonic::Status> {
                    self.call(request, "/runtime.v1.RuntimeService/ListPodSandbox")
                        .await
                }

                pub async fn create_container(
                    &mut self,
                    request: impl tonic::IntoRequest<CreateContainerRequest>,
                ) -> Result<tonic::Response<CreateContainerResponse>, tonic::Status> {
                    self.call(request, "/runtime.v1.RuntimeService/CreateContainer")
                        .await
                }

                pub async fn start_container(
                    &mut self,
                    request: impl tonic::IntoRequest<StartContainerRequest>,
                ) -> Result<tonic::Response<StartContainerResponse>, tonic::Status> {
                    self.call(request, "/runtime.v1.RuntimeService/StartContainer")
                        .await
                }

                pub async fn list_container_stats(
                    &mut self,
                    request: impl tonic::IntoRequest<ListContainerStatsRequest>,
                ) -> Result<tonic::Response<ListContainerStatsResponse>, tonic::Status> {
                    self.call(request, "/runtime.v1.RuntimeService/ListContainerStats")
                        .await
                }
            }
        }

        pub mod image_service_client {
            use super::*;
            use tonic::codegen::*;

            #[derive(Debug, Clone)]
            pub struct ImageServiceClient<T> {
                inner: tonic::client::Grpc<T>,
            }

            impl ImageServiceClient<tonic::transport::Channel> {
                pub fn new(channel: tonic::transport::Channel) -> Self {
                    let inner = tonic::client::Grpc::new(channel);
                    Self { inner }
                }
            }

            impl<T> ImageServiceClient<T>
            where
                T: tonic::client::GrpcService<tonic::body::BoxBody>,
                T::Error: Into<StdError>,
                T::ResponseBody: Body<Data = Bytes> + Send + 'static,
                <T::ResponseBody as Body>::Error: Into<StdError> + Send,
            {
                pub async fn image_status(
                    &mut self,
                    request: impl tonic::IntoRequest<ImageStatusRequest>,
                ) -> Result<tonic::Response<ImageStatusResponse>, tonic::Status> {
                    self.inner.ready().await.map_err(|e| {
                        tonic::Status::new(
                            tonic::Code::Unknown,
                            format!("Service was not ready: {}", e.into()),
                        )
                    })?;
                    let codec = tonic::codec::ProstCodec::default();
                    let path =
                        http::uri::PathAndQuery::from_static("/runtime.v1.ImageService/ImageStatus");
                    self.inner.unary(request.into_request(), path, codec).await
                }

                pub async fn pull_image(
                    &mut self,
                    request: impl tonic::IntoRequest<PullImageRequest>,
                ) -> Result<tonic::Response<PullImageResponse>, tonic::Status> {
                    self.inner.ready().await.map_err(|e| {
                        tonic::Status::new(
                            tonic::Code::Unknown,
                            format!("Service was not ready: {}", e.into()),
                        )
                    })?;
                    let codec = tonic::codec::ProstCodec::default();
                    let path =
                        http::uri::PathAndQuery::from_static("/runtime.v1.ImageService/PullImage");
                    self.inner.unary(request.into_request(), path, codec).await
                }
            }
        }
    }
}

pub use runtime::v1::image_service_client::ImageServiceClient;
pub use runtime::v1::runtime_service_client::RuntimeServiceClient;
pub use runtime::v1::*;
