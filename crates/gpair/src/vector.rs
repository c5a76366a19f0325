//! Mirrored host/device buffer with lazy synchronization.
//!
//! [`HostDeviceVector`] keeps up to two physical copies of a numeric
//! sequence: one in host memory and one in (simulated) accelerator memory.
//! Which copy is authoritative is tracked by an explicit [`SyncState`]
//! machine rather than implicit aliasing, so every synchronization point is
//! auditable: transfers happen only on the first cross-device access after
//! a write, and are counted.
//!
//! The single built-in accelerator backend stores its "device" allocation in
//! ordinary memory; kernels launched by the dispatcher operate on that copy.
//! A real accelerator would replace the allocation and the two transfer
//! points without touching the state machine.

/// Which copy of the data is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// The host copy was written most recently; the device copy (if any)
    /// is stale.
    HostNewer,
    /// The device copy was written most recently; the host copy is stale.
    DeviceNewer,
    /// Both copies hold identical data.
    InSync,
}

/// A value-like buffer mirrored between host and accelerator memory.
///
/// Readers always observe the most recently written copy; the transfer
/// needed to make that true happens lazily at the access itself, never
/// eagerly at write time. Access methods take `&mut self` because a
/// logically-read access may perform that transfer; callers serialize use
/// of a vector across boosting iterations, so this costs nothing.
#[derive(Debug, Clone)]
pub struct HostDeviceVector<T: Copy + Default> {
    host: Vec<T>,
    device: Option<Vec<T>>,
    state: SyncState,
    uploads: usize,
    downloads: usize,
}

impl<T: Copy + Default> HostDeviceVector<T> {
    /// Wrap host data; the host copy starts authoritative and no device
    /// allocation exists until first device access.
    pub fn from_vec(host: Vec<T>) -> Self {
        Self {
            host,
            device: None,
            state: SyncState::HostNewer,
            uploads: 0,
            downloads: 0,
        }
    }

    /// Allocate a zero-initialized vector whose device copy starts
    /// authoritative, for kernels that write a fresh result on the device.
    pub fn with_len_on_device(len: usize) -> Self {
        Self {
            host: vec![T::default(); len],
            device: Some(vec![T::default(); len]),
            state: SyncState::DeviceNewer,
            uploads: 0,
            downloads: 0,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.host.len()
    }

    /// Returns `true` if the vector has zero elements.
    pub fn is_empty(&self) -> bool {
        self.host.is_empty()
    }

    /// Current authoritative-copy state.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Number of (host-to-device, device-to-host) transfers performed so
    /// far. Lets tests audit that synchronization is lazy.
    pub fn transfer_counts(&self) -> (usize, usize) {
        (self.uploads, self.downloads)
    }

    /// Read access to the host copy, downloading first if the device copy
    /// is newer.
    pub fn host(&mut self) -> &[T] {
        self.sync_to_host();
        &self.host
    }

    /// Write access to the host copy; marks the host authoritative.
    pub fn host_mut(&mut self) -> &mut [T] {
        self.sync_to_host();
        self.state = SyncState::HostNewer;
        &mut self.host
    }

    /// Read access to the device copy, uploading first if the host copy is
    /// newer.
    pub fn device(&mut self) -> &[T] {
        self.sync_to_device();
        self.device.as_deref().expect("device copy allocated by sync")
    }

    /// Write access to the device copy; marks the device authoritative.
    pub fn device_mut(&mut self) -> &mut [T] {
        self.sync_to_device();
        self.state = SyncState::DeviceNewer;
        self.device
            .as_deref_mut()
            .expect("device copy allocated by sync")
    }

    /// Consume the vector, returning the up-to-date host data.
    pub fn into_host_vec(mut self) -> Vec<T> {
        self.sync_to_host();
        self.host
    }

    fn sync_to_host(&mut self) {
        if self.state == SyncState::DeviceNewer {
            let device = self
                .device
                .as_ref()
                .expect("DeviceNewer implies a device copy exists");
            self.host.copy_from_slice(device);
            self.downloads += 1;
            self.state = SyncState::InSync;
        }
    }

    fn sync_to_device(&mut self) {
        if self.device.is_none() {
            self.device = Some(vec![T::default(); self.host.len()]);
        }
        if self.state == SyncState::HostNewer {
            self.device
                .as_deref_mut()
                .expect("allocated above")
                .copy_from_slice(&self.host);
            self.uploads += 1;
            self.state = SyncState::InSync;
        }
    }
}

impl<T: Copy + Default> From<Vec<T>> for HostDeviceVector<T> {
    fn from(host: Vec<T>) -> Self {
        Self::from_vec(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_reads_need_no_transfer() {
        let mut v = HostDeviceVector::from_vec(vec![1.0f32, 2.0, 3.0]);
        assert_eq!(v.state(), SyncState::HostNewer);
        assert_eq!(v.host(), &[1.0, 2.0, 3.0]);
        assert_eq!(v.transfer_counts(), (0, 0));
    }

    #[test]
    fn first_device_read_uploads_once() {
        let mut v = HostDeviceVector::from_vec(vec![1.0f32, 2.0]);
        assert_eq!(v.device(), &[1.0, 2.0]);
        assert_eq!(v.state(), SyncState::InSync);
        assert_eq!(v.transfer_counts(), (1, 0));

        // Repeated device reads stay free.
        let _ = v.device();
        assert_eq!(v.transfer_counts(), (1, 0));
    }

    #[test]
    fn host_write_invalidates_device_copy() {
        let mut v = HostDeviceVector::from_vec(vec![1.0f32, 2.0]);
        let _ = v.device();
        v.host_mut()[0] = 9.0;
        assert_eq!(v.state(), SyncState::HostNewer);

        // The stale device copy is refreshed lazily on the next access.
        assert_eq!(v.device(), &[9.0, 2.0]);
        assert_eq!(v.transfer_counts(), (2, 0));
    }

    #[test]
    fn device_write_read_back_on_host() {
        let mut v = HostDeviceVector::from_vec(vec![0.0f32; 3]);
        for (i, x) in v.device_mut().iter_mut().enumerate() {
            *x = i as f32;
        }
        assert_eq!(v.state(), SyncState::DeviceNewer);
        assert_eq!(v.host(), &[0.0, 1.0, 2.0]);
        assert_eq!(v.state(), SyncState::InSync);
        assert_eq!(v.transfer_counts(), (1, 1));
    }

    #[test]
    fn with_len_on_device_counts_no_upload() {
        let mut v = HostDeviceVector::<f32>::with_len_on_device(4);
        assert_eq!(v.state(), SyncState::DeviceNewer);
        v.device_mut().fill(7.0);
        assert_eq!(v.into_host_vec(), vec![7.0; 4]);
    }

    #[test]
    fn into_host_vec_syncs() {
        let mut v = HostDeviceVector::from_vec(vec![1.0f32, 2.0]);
        v.device_mut()[1] = 5.0;
        assert_eq!(v.into_host_vec(), vec![1.0, 5.0]);
    }
}
