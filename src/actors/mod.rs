// Actor模块 - 使用Actor模式管理并发状态
//
// 用Actor模式替代Arc<Mutex<T>>，通过消息传递实现并发控制

pub mod viewer;

pub use viewer::{ViewerActor, ViewerCommand, ViewerHandle, ViewerProvider};
