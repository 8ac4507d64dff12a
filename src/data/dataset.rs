use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// One partition of examples: an image buffer plus a class label per image.
///
/// Images are stored row-major, one example after another. `image_shape`
/// is the per-example shape, either flat (`[1024]`) or rank-2 (`[32, 32]`).
#[derive(Debug, Clone)]
pub struct DataSet {
    images: Vec<f64>,
    image_shape: Vec<usize>,
    labels: Vec<usize>,
}

impl DataSet {
    /// Fails unless the buffer holds exactly one image per label and every
    /// label is below `num_classes`.
    pub fn new(
        images: Vec<f64>,
        image_shape: Vec<usize>,
        labels: Vec<usize>,
        num_classes: usize,
    ) -> Result<DataSet> {
        let example_size: usize = image_shape.iter().product();
        if example_size == 0 {
            return Err(Error::InvalidArgument(format!(
                "image shape {:?} has no pixels",
                image_shape
            )));
        }
        if images.len() % example_size != 0 {
            return Err(Error::shape(
                format!("a multiple of {} pixels", example_size),
                images.len(),
            ));
        }
        let n_images = images.len() / example_size;
        if n_images != labels.len() {
            return Err(Error::InvalidArgument(format!(
                "{} images but {} labels",
                n_images,
                labels.len()
            )));
        }
        if let Some((i, &bad)) = labels.iter().enumerate().find(|&(_, &l)| l >= num_classes) {
            return Err(Error::InvalidArgument(format!(
                "label {} at index {} is out of range for {} classes",
                bad, i, num_classes
            )));
        }

        Ok(DataSet {
            images,
            image_shape,
            labels,
        })
    }

    pub fn num_examples(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Pixels per example.
    pub fn example_size(&self) -> usize {
        self.image_shape.iter().product()
    }

    /// Full array shape, `[n, ...image_shape]`.
    pub fn shape(&self) -> Vec<usize> {
        let mut shape = vec![self.num_examples()];
        shape.extend_from_slice(&self.image_shape);
        shape
    }

    pub fn images(&self) -> &[f64] {
        &self.images
    }

    pub fn image(&self, index: usize) -> &[f64] {
        let size = self.example_size();
        &self.images[index * size..(index + 1) * size]
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Gathers the given examples into a `(indices.len(), example_size)`
    /// feature matrix and the matching labels.
    pub fn gather(&self, indices: &[usize]) -> (Matrix, Vec<usize>) {
        let size = self.example_size();
        let mut data = Vec::with_capacity(indices.len() * size);
        let mut labels = Vec::with_capacity(indices.len());
        for &i in indices {
            data.extend_from_slice(self.image(i));
            labels.push(self.labels[i]);
        }
        let features = Matrix {
            rows: indices.len(),
            cols: size,
            data,
        };
        (features, labels)
    }
}

/// Train and test partitions.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub train: DataSet,
    pub test: DataSet,
}
