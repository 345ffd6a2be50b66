mod clusters;

pub(crate) use clusters::cluster;
