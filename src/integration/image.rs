//! # 二维衍射图像
//!
//! 行主序的二维浮点图像，探测器像素阵列的统一表示。
//!
//! ## 依赖关系
//! - 被 `integration/tools.rs` 和 `commands/integrate.rs` 使用
//! - 使用 `csv` 读取文本图像

use std::path::Path;

use crate::error::{PairdistError, Result};

/// 行主序二维图像
#[derive(Debug, Clone)]
pub struct Image {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl Image {
    /// 从平铺数据创建
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(PairdistError::Other(format!(
                "image data length {} does not match {}x{}",
                data.len(),
                rows,
                cols
            )));
        }
        if rows == 0 || cols == 0 {
            return Err(PairdistError::Other("image must not be empty".to_string()));
        }
        Ok(Image { data, rows, cols })
    }

    /// 从 CSV 文本读取（每行一个像素行）
    pub fn from_csv(path: &Path) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(false)
            .from_path(path)?;

        let mut data = Vec::new();
        let mut rows = 0;
        let mut cols = 0;

        for record in rdr.records() {
            let record = record?;
            if rows == 0 {
                cols = record.len();
            }
            for field in record.iter() {
                let value: f64 =
                    field
                        .trim()
                        .parse()
                        .map_err(|_| PairdistError::ParseError {
                            format: "image".to_string(),
                            path: path.display().to_string(),
                            reason: format!("invalid pixel value '{}'", field),
                        })?;
                data.push(value);
            }
            rows += 1;
        }

        Image::new(data, rows, cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    /// 平铺像素视图
    pub fn pixels(&self) -> &[f64] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_shape_mismatch() {
        assert!(Image::new(vec![1.0; 5], 2, 3).is_err());
        assert!(Image::new(vec![], 0, 0).is_err());
    }

    #[test]
    fn test_get_set() {
        let mut img = Image::new(vec![0.0; 6], 2, 3).unwrap();
        img.set(1, 2, 7.5);
        assert!((img.get(1, 2) - 7.5).abs() < 1e-12);
        assert_eq!(img.shape(), (2, 3));
    }
}
