/*
 * @Author       : 老董
 * @Description  : 图像样本与数据集接口
 */

use super::DataError;
use ndarray::Array2;

/// 带分类标签的多通道二维样本
///
/// 每个通道是形状为 `[rows, cols]` 的矩阵，第 `c` 个通道喂给第 `c` 个输入节点。
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    channels: Vec<Array2<f64>>,
    classification: usize,
}

impl Image {
    /// 创建图像
    ///
    /// # 参数
    /// - `channels`: 各通道像素，形状必须一致
    /// - `classification`: 类别下标
    pub fn new(channels: Vec<Array2<f64>>, classification: usize) -> Result<Self, DataError> {
        let first = channels.first().ok_or(DataError::NoChannels)?;
        let expected = first.dim();
        if let Some(bad) = channels.iter().find(|c| c.dim() != expected) {
            return Err(DataError::ShapeMismatch {
                expected,
                got: bad.dim(),
            });
        }
        Ok(Self {
            channels,
            classification,
        })
    }

    /// 单通道图像的便捷构造
    pub fn single_channel(pixels: Array2<f64>, classification: usize) -> Self {
        Self {
            channels: vec![pixels],
            classification,
        }
    }

    pub const fn classification(&self) -> usize {
        self.classification
    }

    pub fn rows(&self) -> usize {
        self.channels[0].nrows()
    }

    pub fn cols(&self) -> usize {
        self.channels[0].ncols()
    }

    pub fn number_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, channel: usize) -> Option<&Array2<f64>> {
        self.channels.get(channel)
    }

    /// 第 `channel` 通道中 (y, x) 处的像素
    pub fn pixel(&self, channel: usize, y: usize, x: usize) -> f64 {
        self.channels[channel][[y, x]]
    }
}

/// 基因组训练与评估所需的数据集接口
pub trait ImageSet {
    /// 样本总数
    fn number_images(&self) -> usize;

    /// 类别数（也是 softmax 输出节点的个数）
    fn number_classes(&self) -> usize;

    /// 按下标获取样本，下标必须小于 [`ImageSet::number_images`]
    fn image(&self, index: usize) -> &Image;
}

/// 常驻内存的图像数据集
#[derive(Debug, Clone)]
pub struct ImageDataset {
    images: Vec<Image>,
    number_classes: usize,
}

impl ImageDataset {
    /// 创建数据集，所有标签必须小于 `number_classes`
    pub fn new(images: Vec<Image>, number_classes: usize) -> Result<Self, DataError> {
        if let Some((index, image)) = images
            .iter()
            .enumerate()
            .find(|(_, image)| image.classification() >= number_classes)
        {
            return Err(DataError::LabelOutOfRange {
                index,
                label: image.classification(),
                number_classes,
            });
        }
        Ok(Self {
            images,
            number_classes,
        })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Image> {
        self.images.iter()
    }
}

impl ImageSet for ImageDataset {
    fn number_images(&self) -> usize {
        self.images.len()
    }

    fn number_classes(&self) -> usize {
        self.number_classes
    }

    fn image(&self, index: usize) -> &Image {
        &self.images[index]
    }
}
