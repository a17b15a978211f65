use candle_core::{DType, Tensor};
use candle_nn::{AdamW, Linear, Module, Optimizer, ParamsAdamW, VarBuilder, VarMap, linear};

use crate::device::DEVICE;

pub struct MultiLayerPerceptron {
    pub layers: Vec<Linear>,
    pub var_map: VarMap,
    pub optimiser: AdamW,
}

impl MultiLayerPerceptron {
    pub fn new(
        topology: &[usize],
        learning_rate: f64,
        weight_decay: f64,
    ) -> Result<Self, candle_core::Error> {
        let vm = VarMap::new();
        let vb = VarBuilder::from_varmap(&vm, DType::F32, &DEVICE);
        let mut layers: Vec<Linear> = Vec::with_capacity(topology.len() - 1);

        for i in 0..(topology.len() - 1) {
            layers.push(linear(topology[i], topology[i + 1], vb.pp(i))?);
        }

        let adam = AdamW::new(
            vm.all_vars(),
            ParamsAdamW {
                lr: learning_rate,
                weight_decay,
                ..Default::default()
            },
        )?;

        Ok(Self {
            layers,
            var_map: vm,
            optimiser: adam,
        })
    }

    /// ReLU between layers; the last layer stays linear so callers get raw
    /// logits.
    pub fn output(&self, inputs: Tensor) -> Result<Tensor, candle_core::Error> {
        let mut x = inputs;
        for layer in self.layers.iter().take(self.layers.len() - 1) {
            x = layer.forward(&x)?;
            x = x.relu()?;
        }
        if let Some(last_layer) = self.layers.last() {
            x = last_layer.forward(&x)?;
        }
        Ok(x)
    }
}
