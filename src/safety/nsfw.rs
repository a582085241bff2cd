use anyhow::{Result, anyhow};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::vit;
use hf_hub::{Repo, RepoType, api::sync::Api};
use image::ImageReader;
use std::io::Cursor;
use std::sync::Mutex;

use super::SafetyScorer;

const MODEL_REPO: &str = "LukeJacob2023/nsfw-image-detector";
const IMAGE_SIZE: usize = 224;

// Class indices from model config:
// 0: drawings (safe)
// 1: hentai (explicit)
// 2: neutral (safe)
// 3: porn (explicit)
// 4: sexy (explicit)
const NUM_CLASSES: usize = 5;
const CLASS_HENTAI: usize = 1;
const CLASS_PORN: usize = 3;
const CLASS_SEXY: usize = 4;

/// NSFW scorer using the LukeJacob2023/nsfw-image-detector ViT model.
/// The unsafe score is the summed probability of the explicit classes
/// (hentai + porn + sexy) after softmax.
pub struct NsfwScorer {
    model: Mutex<vit::Model>,
    device: Device,
}

impl NsfwScorer {
    pub fn new() -> Result<Self> {
        #[cfg(feature = "metal")]
        let device = Device::new_metal(0).unwrap_or(Device::Cpu);
        #[cfg(not(feature = "metal"))]
        let device = Device::Cpu;

        tracing::info!(?device, "loading NSFW detection model");

        let api = Api::new()?;
        let repo = api.repo(Repo::new(MODEL_REPO.to_string(), RepoType::Model));

        let model_path = repo.get("model.safetensors")?;
        let config_path = repo.get("config.json")?;

        let config: vit::Config = serde_json::from_str(&std::fs::read_to_string(config_path)?)?;
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[model_path], DType::F32, &device)? };
        let model = vit::Model::new(&config, NUM_CLASSES, vb)?;

        tracing::info!("NSFW model loaded");

        Ok(Self {
            model: Mutex::new(model),
            device,
        })
    }

    /// Decode, resize to 224x224 RGB, normalize with mean=0.5 std=0.5,
    /// CHW layout.
    fn preprocess(&self, data: &[u8]) -> Result<Tensor> {
        let img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()?
            .decode()?;

        let resized = image::imageops::resize(
            &img.to_rgb8(),
            IMAGE_SIZE as u32,
            IMAGE_SIZE as u32,
            image::imageops::FilterType::Triangle,
        );

        let mean = 0.5;
        let std = 0.5;
        let mut chw = vec![0f32; 3 * IMAGE_SIZE * IMAGE_SIZE];
        for (i, pixel) in resized.pixels().enumerate() {
            let r = pixel[0] as f32 / 255.0;
            let g = pixel[1] as f32 / 255.0;
            let b = pixel[2] as f32 / 255.0;
            chw[i] = (r - mean) / std;
            chw[IMAGE_SIZE * IMAGE_SIZE + i] = (g - mean) / std;
            chw[2 * IMAGE_SIZE * IMAGE_SIZE + i] = (b - mean) / std;
        }

        let tensor = Tensor::from_vec(chw, (1, 3, IMAGE_SIZE, IMAGE_SIZE), &self.device)?;
        Ok(tensor)
    }
}

impl SafetyScorer for NsfwScorer {
    fn score(&self, data: &[u8]) -> Result<f32> {
        let input = self.preprocess(data)?;
        let model = self.model.lock().map_err(|e| anyhow!("lock error: {e}"))?;
        let logits = model.forward(&input)?;

        let probs = candle_nn::ops::softmax(&logits, 1)?;
        let probs_vec: Vec<f32> = probs.flatten_all()?.to_vec1()?;
        if probs_vec.len() != NUM_CLASSES {
            return Err(anyhow!(
                "expected {} class probabilities, got {}",
                NUM_CLASSES,
                probs_vec.len()
            ));
        }

        let unsafe_score =
            probs_vec[CLASS_HENTAI] + probs_vec[CLASS_PORN] + probs_vec[CLASS_SEXY];

        tracing::debug!(
            hentai = probs_vec[CLASS_HENTAI],
            porn = probs_vec[CLASS_PORN],
            sexy = probs_vec[CLASS_SEXY],
            unsafe_score,
            "classified image"
        );

        Ok(unsafe_score)
    }
}
