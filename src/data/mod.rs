//! # Data
//!
//! In-memory image datasets and a restartable batch loader. Images are
//! stored flattened, one row per example. Every batch carries the sender's
//! view, the labels and the receiver's view of the same images; the
//! receiver's view goes through the loader's [`Augmentation`].

use ndarray::{Array1, Array2, Axis};
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use serde::{Serialize, Deserialize};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

use crate::config::DataConfig;
use crate::error::{EmcomError, Result};

/// One step's worth of examples
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub sender_input: Array2<f32>,
    pub labels: Array1<usize>,
    pub receiver_input: Array2<f32>,
}

impl Batch {
    pub fn new(sender_input: Array2<f32>, labels: Array1<usize>, receiver_input: Array2<f32>) -> Result<Self> {
        let n = sender_input.nrows();
        if labels.len() != n || receiver_input.nrows() != n {
            return Err(EmcomError::dimension_mismatch(
                format!("{} examples in every field", n),
                format!("{} labels and {} receiver inputs", labels.len(), receiver_input.nrows()),
            ));
        }
        Ok(Batch { sender_input, labels, receiver_input })
    }

    pub fn size(&self) -> usize {
        self.labels.len()
    }
}

/// Flattened images with integer class labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDataset {
    pub images: Array2<f32>,
    pub labels: Array1<usize>,
}

impl ImageDataset {
    pub fn new(images: Array2<f32>, labels: Array1<usize>) -> Result<Self> {
        if images.nrows() != labels.len() {
            return Err(EmcomError::dimension_mismatch(
                format!("{} labels", images.nrows()),
                format!("{} labels", labels.len()),
            ));
        }
        Ok(ImageDataset { images, labels })
    }

    /// Random class prototypes plus per-example noise, reproducible from `seed`
    pub fn synthetic(num_examples: usize, image_dim: usize, num_classes: usize, seed: u64) -> Result<Self> {
        if num_classes == 0 || image_dim == 0 {
            return Err(EmcomError::configuration("dataset", "synthetic data needs at least one class and one feature"));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let unit = Normal::new(0.0f32, 1.0).map_err(|e| EmcomError::configuration("dataset", e.to_string()))?;
        let prototypes = Array2::random_using((num_classes, image_dim), unit, &mut rng);
        let labels = Array1::from_shape_fn(num_examples, |_| rng.gen_range(0..num_classes));
        let noise = Array2::random_using((num_examples, image_dim), unit, &mut rng) * 0.1;
        let images = prototypes.select(Axis(0), labels.as_slice().unwrap_or(&[])) + noise;
        Self::new(images, labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn image_dim(&self) -> usize {
        self.images.ncols()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = bincode::serialize(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(&serialized)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = fs::File::open(path).map_err(|e| {
            EmcomError::configuration("dataset", format!("cannot open {}: {}", path.display(), e))
        })?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        let dataset: ImageDataset = bincode::deserialize(&buffer)?;
        Self::new(dataset.images, dataset.labels)
    }
}

/// Transformation producing the receiver's view of an image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Augmentation {
    /// The receiver sees the same image as the sender
    #[default]
    Identity,
    /// Additive zero-mean Gaussian noise
    GaussianNoise { std: f32 },
}

/// Batches over a dataset in sequential or seeded shuffled order.
///
/// The last incomplete batch is always dropped. Iteration is lazy and can be
/// restarted any number of times; with shuffling, the order depends only on
/// the seed and the epoch set through [`DataLoader::set_epoch`].
#[derive(Debug)]
pub struct DataLoader {
    dataset: ImageDataset,
    batch_size: usize,
    shuffle_seed: Option<u64>,
    augmentation: Augmentation,
    epoch: usize,
}

impl DataLoader {
    pub fn new(dataset: ImageDataset, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(EmcomError::configuration("batch_size", "batch size must be positive"));
        }
        Ok(DataLoader {
            dataset,
            batch_size,
            shuffle_seed: None,
            augmentation: Augmentation::Identity,
            epoch: 0,
        })
    }

    /// Build a loader from the `[data]` section; shuffling uses `seed`
    pub fn from_config(dataset: ImageDataset, config: &DataConfig, seed: u64) -> Result<Self> {
        let loader = DataLoader::new(dataset, config.batch_size)?.with_augmentation(config.augmentation)?;
        Ok(if config.shuffle { loader.with_shuffle(seed) } else { loader })
    }

    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn with_augmentation(mut self, augmentation: Augmentation) -> Result<Self> {
        if let Augmentation::GaussianNoise { std } = augmentation {
            if !(std >= 0.0 && std.is_finite()) {
                return Err(EmcomError::configuration("augmentation", "noise std must be finite and non-negative"));
            }
        }
        self.augmentation = augmentation;
        Ok(self)
    }

    /// Select the epoch whose shuffle order and augmentation noise are used
    pub fn set_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn dataset(&self) -> &ImageDataset {
        &self.dataset
    }

    /// Number of complete batches
    pub fn len(&self) -> usize {
        self.dataset.len() / self.batch_size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Batches<'_> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        let base_seed = self.shuffle_seed.unwrap_or(0);
        let epoch_seed = base_seed.wrapping_add(self.epoch as u64);
        if self.shuffle_seed.is_some() {
            order.shuffle(&mut StdRng::seed_from_u64(epoch_seed));
        }
        debug!(batches = self.len(), epoch = self.epoch, "starting data pass");
        Batches {
            loader: self,
            order,
            position: 0,
            rng: StdRng::seed_from_u64(epoch_seed ^ 0x9e37_79b9_7f4a_7c15),
        }
    }
}

impl<'a> IntoIterator for &'a DataLoader {
    type Item = Batch;
    type IntoIter = Batches<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy pass over a [`DataLoader`]
pub struct Batches<'a> {
    loader: &'a DataLoader,
    order: Vec<usize>,
    position: usize,
    rng: StdRng,
}

impl<'a> Iterator for Batches<'a> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let batch_size = self.loader.batch_size;
        if self.position + batch_size > self.order.len() {
            return None;
        }
        let indices = &self.order[self.position..self.position + batch_size];
        self.position += batch_size;

        let dataset = &self.loader.dataset;
        let sender_input = dataset.images.select(Axis(0), indices);
        let labels = dataset.labels.select(Axis(0), indices);
        let receiver_input = match self.loader.augmentation {
            Augmentation::Identity => sender_input.clone(),
            Augmentation::GaussianNoise { std } => {
                // validated in with_augmentation
                match Normal::new(0.0f32, std) {
                    Ok(noise) => &sender_input + &Array2::random_using(sender_input.dim(), noise, &mut self.rng),
                    Err(_) => sender_input.clone(),
                }
            }
        };
        Some(Batch { sender_input, labels, receiver_input })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.order.len() - self.position) / self.loader.batch_size;
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(n: usize) -> ImageDataset {
        let images = Array2::from_shape_fn((n, 3), |(i, j)| (i * 10 + j) as f32);
        ImageDataset::new(images, Array1::from_iter(0..n)).unwrap()
    }

    #[test]
    fn test_drop_last_and_sequential_order() {
        let loader = DataLoader::new(dataset(10), 4).unwrap();
        assert_eq!(loader.len(), 2);
        let batches: Vec<Batch> = loader.iter().collect();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].labels.to_vec(), vec![4, 5, 6, 7]);
        assert_eq!(batches[0].sender_input, batches[0].receiver_input);
    }

    #[test]
    fn test_restartable_and_epoch_dependent_shuffle() {
        let mut loader = DataLoader::new(dataset(32), 8).unwrap().with_shuffle(5);
        let first: Vec<_> = loader.iter().map(|b| b.labels).collect();
        let again: Vec<_> = loader.iter().map(|b| b.labels).collect();
        assert_eq!(first, again);

        loader.set_epoch(1);
        let next_epoch: Vec<_> = loader.iter().map(|b| b.labels).collect();
        assert_ne!(first, next_epoch);
    }

    #[test]
    fn test_loader_from_config_honours_shuffle() {
        let sequential: Vec<_> = (0..4).map(|i| Array1::from_iter(i * 8..(i + 1) * 8)).collect();
        let mut config = DataConfig { batch_size: 8, ..DataConfig::default() };

        let plain = DataLoader::from_config(dataset(32), &config, 5).unwrap();
        assert_eq!(plain.iter().map(|b| b.labels).collect::<Vec<_>>(), sequential);

        config.shuffle = true;
        let shuffled = DataLoader::from_config(dataset(32), &config, 5).unwrap();
        let order: Vec<_> = shuffled.iter().map(|b| b.labels).collect();
        assert_ne!(order, sequential);
        let same_seed = DataLoader::new(dataset(32), 8).unwrap().with_shuffle(5);
        assert_eq!(order, same_seed.iter().map(|b| b.labels).collect::<Vec<_>>());

        config.batch_size = 0;
        assert!(DataLoader::from_config(dataset(32), &config, 5).unwrap_err().is_configuration());
    }

    #[test]
    fn test_noise_augmentation_changes_receiver_view_only() {
        let loader = DataLoader::new(dataset(4), 4)
            .unwrap()
            .with_augmentation(Augmentation::GaussianNoise { std: 0.5 })
            .unwrap();
        let batch = loader.iter().next().unwrap();
        assert_eq!(batch.sender_input, dataset(4).images);
        assert_ne!(batch.sender_input, batch.receiver_input);
    }

    #[test]
    fn test_invalid_loader_settings() {
        assert!(DataLoader::new(dataset(4), 0).unwrap_err().is_configuration());
        let bad = DataLoader::new(dataset(4), 2).unwrap().with_augmentation(Augmentation::GaussianNoise { std: -1.0 });
        assert!(bad.is_err());
        assert!(ImageDataset::new(Array2::zeros((3, 2)), Array1::zeros(2)).is_err());
    }

    #[test]
    fn test_synthetic_dataset_is_reproducible() {
        let a = ImageDataset::synthetic(20, 6, 3, 9).unwrap();
        let b = ImageDataset::synthetic(20, 6, 3, 9).unwrap();
        assert_eq!(a.images, b.images);
        assert!(a.labels.iter().all(|&l| l < 3));
    }

    #[test]
    fn test_dataset_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        dataset(5).save(&path).unwrap();
        let loaded = ImageDataset::load(&path).unwrap();
        assert_eq!(loaded.len(), 5);
        assert_eq!(loaded.image_dim(), 3);
    }
}
