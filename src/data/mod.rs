//! 数据集模块
//!
//! 基因组只通过 [`ImageSet`] 访问训练数据：样本数、类别数、按下标取带标签的二维样本。
//!
//! # 主要组件
//!
//! - [`Image`]: 带分类标签的多通道二维样本
//! - [`ImageSet`]: 基因组所需的最小数据集接口
//! - [`ImageDataset`]: 常驻内存的数据集实现
//! - [`DataError`]: 构建数据集时的错误类型
//!
//! # 使用示例
//!
//! ```ignore
//! use exact_cnn::data::{Image, ImageDataset, ImageSet};
//!
//! let dataset = ImageDataset::new(images, 10)?;
//! println!("样本数: {}", dataset.number_images());
//! ```

pub mod error;
mod image;


pub use error::DataError;
pub use image::{Image, ImageDataset, ImageSet};
