use anyhow::{Result, anyhow};
use std::ffi::c_void;
use vulkanalia::prelude::v1_3::*;

/// Picks a memory type allowed by `type_bits` that has every `required`
/// property, favouring one that also has every `preferred` property.
pub fn find_memory_type(
    properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
    preferred: vk::MemoryPropertyFlags,
) -> Option<u32> {
    let candidates = (0..properties.memory_type_count).filter(|index| {
        let flags = properties.memory_types[*index as usize].property_flags;
        type_bits & (1 << index) != 0 && flags.contains(required)
    });

    let mut fallback = None;
    for index in candidates {
        let flags = properties.memory_types[index as usize].property_flags;
        if flags.contains(required | preferred) {
            return Some(index);
        }
        fallback.get_or_insert(index);
    }
    fallback
}

/// Host reads and writes at arbitrary offsets, so cached memory is preferred.
const HOST_RANDOM_ACCESS: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::HOST_CACHED;

#[derive(Clone, Debug)]
pub struct BufferInfo<'a> {
    pub size: u64,
    pub name: &'a str,
}

/// A persistently mapped, host-visible buffer with a device address,
/// randomly accessible from the host.
///
/// Not `Clone`: destroying consumes the handle, so it happens at most once.
#[derive(Debug)]
pub struct Buffer {
    pub(super) handle: vk::Buffer,
    pub(super) memory: vk::DeviceMemory,
    size: u64,
    mapped: *mut c_void,
    device_address: vk::DeviceAddress,
}

impl Buffer {
    pub(super) unsafe fn create(
        instance: &Instance,
        device: &Device,
        physical_device: vk::PhysicalDevice,
        info: &BufferInfo<'_>,
    ) -> Result<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(info.size)
            .usage(
                vk::BufferUsageFlags::STORAGE_BUFFER
                    | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS
                    | vk::BufferUsageFlags::TRANSFER_SRC
                    | vk::BufferUsageFlags::TRANSFER_DST,
            )
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let handle = device.create_buffer(&buffer_info, None)?;

        let requirements = device.get_buffer_memory_requirements(handle);
        let memory_properties = instance.get_physical_device_memory_properties(physical_device);
        let Some(memory_type) = find_memory_type(
            &memory_properties,
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            HOST_RANDOM_ACCESS,
        ) else {
            device.destroy_buffer(handle, None);
            return Err(anyhow!("No host-visible memory type for buffer `{}`.", info.name));
        };

        let mut flags_info =
            vk::MemoryAllocateFlagsInfo::builder().flags(vk::MemoryAllocateFlags::DEVICE_ADDRESS);
        let allocate_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type)
            .push_next(&mut flags_info);
        let memory = match device.allocate_memory(&allocate_info, None) {
            Ok(memory) => memory,
            Err(error) => {
                device.destroy_buffer(handle, None);
                return Err(anyhow!(error));
            }
        };

        let mapped = match device
            .bind_buffer_memory(handle, memory, 0)
            .and_then(|_| device.map_memory(memory, 0, info.size, vk::MemoryMapFlags::empty()))
        {
            Ok(mapped) => mapped,
            Err(error) => {
                device.destroy_buffer(handle, None);
                device.free_memory(memory, None);
                return Err(anyhow!(error));
            }
        };
        let address_info = vk::BufferDeviceAddressInfo::builder().buffer(handle);
        let device_address = device.get_buffer_device_address(&address_info);

        tracing::debug!(
            "Created buffer `{}` ({} bytes, memory type {}).",
            info.name,
            info.size,
            memory_type
        );
        Ok(Self {
            handle,
            memory,
            size: info.size,
            mapped,
            device_address,
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Start of the mapping; valid for `size` bytes until the buffer is destroyed.
    pub fn host_address(&self) -> *mut c_void {
        self.mapped
    }

    pub fn device_address(&self) -> vk::DeviceAddress {
        self.device_address
    }
}
