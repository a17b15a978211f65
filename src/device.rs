use candle_core::Device;
use once_cell::sync::Lazy;

pub static DEVICE: Lazy<Device> = Lazy::new(|| match Device::new_cuda(0) {
    Ok(device) => {
        log::info!("initialized CUDA device");
        device
    }
    Err(err_cuda) => {
        log::info!("CUDA unavailable ({err_cuda:?}), falling back to CPU");
        Device::Cpu
    }
});
