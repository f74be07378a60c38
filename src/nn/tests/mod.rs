mod layer_conv;
